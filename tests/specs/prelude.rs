// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the spec modules.

pub use vigil_core::{SigFlags, SigId, Signature, SmList};
pub use vigil_engine::fake::TestRig;
pub use vigil_engine::Alert;

/// `alert <method> + cookie:<cookie>`
pub fn method_cookie_sig(method: &str, cookie: &str) -> Signature {
    Signature::new(SigId(0))
        .with_tx_list(SmList::HttpMethod, method.to_string())
        .with_tx_list(SmList::HttpCookie, cookie.to_string())
}

/// `alert <method> + header:<header> + cookie:<cookie>`
pub fn method_header_cookie_sig(method: &str, header: &str, cookie: &str) -> Signature {
    Signature::new(SigId(0))
        .with_tx_list(SmList::HttpMethod, method.to_string())
        .with_tx_list(SmList::HttpHeader, header.to_string())
        .with_tx_list(SmList::HttpCookie, cookie.to_string())
}

/// `alert <method> + uri:<uri> [+ filename:<pattern>] [+ filestore]`
pub fn upload_sig(method: &str, uri: &str, filename: Option<&str>, filestore: bool) -> Signature {
    let mut sig = Signature::new(SigId(0))
        .with_tx_list(SmList::HttpMethod, method.to_string())
        .with_tx_list(SmList::HttpUri, uri.to_string());
    if let Some(pattern) = filename {
        sig = sig.with_tx_list(SmList::FileMatch, pattern.to_string());
    }
    if filestore {
        sig = sig.with_flags(SigFlags::FILESTORE);
    }
    sig
}

/// A multipart upload request carrying one file.
pub fn upload_request() -> String {
    let body = "-----------------------------277531038314945\r\n\
                Content-Disposition: form-data; name=\"uploadfile_0\"; filename=\"somepicture1.jpg\"\r\n\
                Content-Type: image/jpeg\r\n\
                \r\n\
                filecontent\r\n\
                -----------------------------277531038314945--";
    format!(
        "POST /upload.cgi HTTP/1.1\r\n\
         Host: www.server.lan\r\n\
         Content-Type: multipart/form-data; boundary=---------------------------277531038314945\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        body.len(),
        body
    )
}

pub fn sids(alerts: &[Alert]) -> Vec<SigId> {
    alerts.iter().map(|a| a.sid).collect()
}

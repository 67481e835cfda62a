//! Blueprint upload and response interpretation.
//!
//! The file goes to the conversion server as `multipart/form-data` (field
//! `file`). The JSON reply carries either `error` or `mesh_data`; `mesh_data`
//! is schema-checked here so nothing malformed reaches the scene builder.
//!
//! Transport is `gloo-net` in the browser and blocking `reqwest` natively
//! (run off the UI thread by [`crate::execute`]). No retry, no timeout.

use futures_channel::oneshot;
use serde::Deserialize;

use crate::mesh::{MeshData, MeshError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub error: Option<String>,
    /// Kept untyped until [`MeshData::from_value`] validates it.
    #[serde(default)]
    pub mesh_data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// A validated mesh plus whatever the server said about it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMesh {
    pub mesh: MeshData,
    pub filename: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Network(String),

    /// Any reply outside 2xx. `detail` keeps the body's `error` text, if any,
    /// for the log; the status line shows the status only.
    #[error("HTTP error! status: {status}")]
    Http { status: u16, detail: Option<String> },

    /// The server answered with an `error` field; shown verbatim.
    #[error("{0}")]
    Server(String),

    #[error("invalid server response: {0}")]
    Malformed(String),

    #[error("server response contained no mesh data")]
    MissingMesh,

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

impl UploadError {
    pub fn is_server_reported(&self) -> bool {
        matches!(self, UploadError::Server(_))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            UploadError::Http {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            UploadError::Network(err.to_string())
        }
    }
}

pub type UploadResult = Result<UploadedMesh, UploadError>;

/// Turns an HTTP status and body into a mesh or a typed error.
///
/// Every non-2xx reply is an [`UploadError::Http`]; only a success reply's
/// `error` field counts as server-reported.
pub fn interpret_response(status: u16, body: &str) -> UploadResult {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<UploadResponse>(body)
            .ok()
            .and_then(|r| r.error);
        return Err(UploadError::Http { status, detail });
    }

    let response: UploadResponse =
        serde_json::from_str(body).map_err(|e| UploadError::Malformed(e.to_string()))?;
    if let Some(message) = response.error {
        return Err(UploadError::Server(message));
    }
    let value = response.mesh_data.ok_or(UploadError::MissingMesh)?;
    let mesh = MeshData::from_value(value)?;
    Ok(UploadedMesh {
        mesh,
        filename: response.filename,
        message: response.message,
    })
}

/// Loads a server reply saved to disk, or a bare `mesh_data` object.
pub fn open_saved_response(file_name: &str, bytes: &[u8]) -> UploadResult {
    let text = std::str::from_utf8(bytes).map_err(|e| UploadError::Malformed(e.to_string()))?;
    let mut uploaded = match interpret_response(200, text) {
        Err(UploadError::MissingMesh) => UploadedMesh {
            mesh: MeshData::from_json_str(text)?,
            filename: None,
            message: None,
        },
        other => other?,
    };
    uploaded.filename.get_or_insert_with(|| file_name.to_owned());
    Ok(uploaded)
}

/// Handle to an upload in flight. Poll once per frame.
pub struct PendingUpload {
    file_name: String,
    receiver: oneshot::Receiver<UploadResult>,
}

impl PendingUpload {
    pub fn channel(file_name: impl Into<String>) -> (oneshot::Sender<UploadResult>, PendingUpload) {
        let (tx, receiver) = oneshot::channel();
        (
            tx,
            PendingUpload {
                file_name: file_name.into(),
                receiver,
            },
        )
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Non-blocking; `None` while the request is still in flight.
    pub fn try_recv(&mut self) -> Option<UploadResult> {
        match self.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(UploadError::Network(
                "upload task ended without a result".into(),
            ))),
        }
    }
}

/// Posts `bytes` as the `file` field and returns immediately.
pub fn start_upload(url: String, file_name: String, bytes: Vec<u8>) -> PendingUpload {
    let (tx, pending) = PendingUpload::channel(file_name.clone());
    log::info!("Uploading {file_name} ({} bytes) to {url}", bytes.len());
    crate::execute(async move {
        let result = match post_blueprint(&url, &file_name, bytes).await {
            Ok((status, body)) => interpret_response(status, &body),
            Err(e) => Err(e),
        };
        match &result {
            Ok(uploaded) => log::info!(
                "Upload of {file_name} converted: {} vertices, {} faces, {} walls",
                uploaded.mesh.vertex_count(),
                uploaded.mesh.face_count(),
                uploaded.mesh.wall_count()
            ),
            Err(UploadError::Http {
                status,
                detail: Some(detail),
            }) => log::warn!("Upload of {file_name} failed with status {status}: {detail}"),
            Err(e) => log::warn!("Upload of {file_name} failed: {e}"),
        }
        // The receiver is gone if a newer upload replaced this one.
        if tx.send(result).is_err() {
            log::debug!("Discarding superseded upload result for {file_name}");
        }
    });
    pending
}

#[cfg(target_arch = "wasm32")]
async fn post_blueprint(url: &str, file_name: &str, bytes: Vec<u8>) -> Result<(u16, String), UploadError> {
    use gloo_net::http::Request;

    let form = web_sys::FormData::new().map_err(js_err)?;
    let array = js_sys::Uint8Array::from(bytes.as_slice());
    let blob = web_sys::Blob::new_with_u8_array_sequence(&js_sys::Array::of1(&array)).map_err(js_err)?;
    form.append_with_blob_and_filename("file", &blob, file_name)
        .map_err(js_err)?;

    let response = Request::post(url)
        .body(form)
        .map_err(net_err)?
        .send()
        .await
        .map_err(net_err)?;
    let status = response.status();
    let body = response.text().await.map_err(net_err)?;
    Ok((status, body))
}

#[cfg(target_arch = "wasm32")]
fn js_err(e: wasm_bindgen::JsValue) -> UploadError {
    UploadError::Network(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

#[cfg(target_arch = "wasm32")]
fn net_err(e: gloo_net::Error) -> UploadError {
    UploadError::Network(e.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
async fn post_blueprint(url: &str, file_name: &str, bytes: Vec<u8>) -> Result<(u16, String), UploadError> {
    use reqwest::blocking::{Client, multipart};

    let part = multipart::Part::bytes(bytes).file_name(file_name.to_owned());
    let form = multipart::Form::new().part("file", part);
    let client = Client::builder().timeout(None).build()?;
    let response = client.post(url).multipart(form).send()?;
    let status = response.status().as_u16();
    let body = response.text()?;
    Ok((status, body))
}

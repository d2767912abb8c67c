/// A named binary payload.
///
/// Used both for caller-supplied input images (after base64 decoding)
/// and for rendered outputs pulled from the ComfyUI content endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Filename the payload is known by on the rendering server.
    pub name: String,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

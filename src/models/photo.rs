/// A user-supplied photo handed into the pipeline.
///
/// The pipeline only reads the bytes for the duration of a run; ownership
/// stays with the caller's photo library. A photo with an empty payload is
/// rejected during validation before any network call is made.
#[derive(Debug, Clone)]
pub struct Photo {
    /// Stable identifier from the caller's photo store.
    pub id: String,
    /// Raw image bytes (JPEG as captured/selected).
    pub bytes: Vec<u8>,
}

impl Photo {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { id: id.into(), bytes }
    }

    pub fn has_payload(&self) -> bool {
        !self.bytes.is_empty()
    }
}

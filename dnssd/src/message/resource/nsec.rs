use super::*;

/// An NSEC record.
///
/// Recognized but not decoded: the next-domain name and type bitmaps stay in
/// the raw data of the owning [`Resource`].
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct NsecResource;

impl NsecResource {
    pub(crate) fn unpack(_r: &mut Reader<'_>) -> Result<Self> {
        Ok(NsecResource)
    }
}

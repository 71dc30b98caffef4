//! Extended Inquiry Response parsing.
//!
//! Recovers an advertised device name from the raw EIR payload of an
//! inquiry result.

/// Maximum length of a BR/EDR advertised device name in bytes.
pub const MAX_DEVICE_NAME_LEN: usize = 248;

/// EIR data type: Shortened Local Name.
const EIR_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;

/// EIR data type: Complete Local Name.
const EIR_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// A device name recovered from EIR data.
///
/// Holds at most [`MAX_DEVICE_NAME_LEN`] bytes; longer source names are
/// truncated at construction. The bytes are not validated as UTF-8 since
/// the matching policy is byte-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    bytes: Vec<u8>,
}

impl ResolvedName {
    /// Build a name from a raw EIR name field, truncating past the cap.
    fn from_field(field: &[u8]) -> Self {
        let len = field.len().min(MAX_DEVICE_NAME_LEN);
        Self {
            bytes: field[..len].to_vec(),
        }
    }

    /// The name bytes, truncated to the advertised-name cap.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the name in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the name is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

/// Extract an advertised device name from a raw EIR payload.
///
/// The complete local name is preferred; the shortened local name is the
/// fallback. Returns `None` for an empty payload or when neither field is
/// present. Pure function of its input.
pub fn resolve_name(eir: &[u8]) -> Option<ResolvedName> {
    if eir.is_empty() {
        return None;
    }

    find_field(eir, EIR_TYPE_COMPLETE_LOCAL_NAME)
        .or_else(|| find_field(eir, EIR_TYPE_SHORT_LOCAL_NAME))
        .map(ResolvedName::from_field)
}

/// Walk the `[length][type][data]` structures of an EIR payload looking for
/// one field type.
///
/// A zero length octet terminates the significant part; a structure that
/// runs past the end of the payload is treated as a malformed tail and
/// ends the walk.
fn find_field(eir: &[u8], field_type: u8) -> Option<&[u8]> {
    let mut offset = 0;

    while offset < eir.len() {
        let len = eir[offset] as usize;
        if len == 0 {
            break;
        }

        let end = offset + 1 + len;
        if end > eir.len() {
            break;
        }

        if eir[offset + 1] == field_type {
            return Some(&eir[offset + 2..end]);
        }

        offset = end;
    }

    None
}

//! Channel interface strings (`<technology>/<extension>[@<context>]`).

/// Extract the extension from an interface string.
///
/// `SIP/1001@from-queue` and `PJSIP/1001` both yield `1001`; for
/// `Local/1001@from-queue/n` only the first segment after the technology is
/// considered. Returns `None` when there is no non-empty extension segment.
pub fn decode_extension(interface: &str) -> Option<&str> {
    let (_, rest) = interface.trim().split_once('/')?;
    let segment = rest.split('/').next().unwrap_or(rest);
    let extension = segment.split('@').next().unwrap_or(segment).trim();
    if extension.is_empty() {
        None
    } else {
        Some(extension)
    }
}

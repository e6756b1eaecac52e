/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `markers`: marker:{site:010}:{period}:{date}:{segment}:{plugin} -> ArchiveMarker (JSON)
/// - `ranges`: range:{site:010}:{start}:{end}:{segment}:{plugin} -> invalidated_at (RFC 3339)
/// - `metadata`: meta:{key} -> value (string)
///
/// Segment and plugin are URL-encoded so they never contain `:`; an empty
/// field stands for "none".
use chrono::NaiveDate;

use super::{ArchiveKey, RangeInvalidation, SiteId};
use crate::period::{DateRange, PeriodKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode a marker key
pub fn encode_marker_key(key: &ArchiveKey) -> Vec<u8> {
    format!(
        "marker:{:010}:{}:{}:{}:{}",
        key.site,
        key.period,
        key.date.format(DATE_FORMAT),
        encode_optional(key.segment.as_deref()),
        encode_optional(key.plugin.as_deref()),
    )
    .into_bytes()
}

/// Decode a marker key back into an [`ArchiveKey`]
pub fn decode_marker_key(raw: &[u8]) -> Option<ArchiveKey> {
    let key_str = std::str::from_utf8(raw).ok()?;
    let parts: Vec<&str> = key_str.strip_prefix("marker:")?.split(':').collect();
    let [site, period, date, segment, plugin] = parts.as_slice() else {
        return None;
    };
    Some(ArchiveKey {
        site: site.parse().ok()?,
        period: period.parse::<PeriodKind>().ok()?,
        date: NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?,
        segment: decode_optional(segment)?,
        plugin: decode_optional(plugin)?,
    })
}

/// Encode the prefix shared by all markers of one site
pub fn encode_site_prefix(site: SiteId) -> Vec<u8> {
    format!("marker:{:010}:", site).into_bytes()
}

/// Encode a range invalidation key
pub fn encode_range_key(range: &RangeInvalidation) -> Vec<u8> {
    format!(
        "range:{:010}:{}:{}:{}:{}",
        range.site,
        range.range.start.format(DATE_FORMAT),
        range.range.end.format(DATE_FORMAT),
        encode_optional(range.segment.as_deref()),
        encode_optional(range.plugin.as_deref()),
    )
    .into_bytes()
}

/// Decode a range invalidation key
pub fn decode_range_key(raw: &[u8]) -> Option<RangeInvalidation> {
    let key_str = std::str::from_utf8(raw).ok()?;
    let parts: Vec<&str> = key_str.strip_prefix("range:")?.split(':').collect();
    let [site, start, end, segment, plugin] = parts.as_slice() else {
        return None;
    };
    let range = DateRange::new(
        NaiveDate::parse_from_str(start, DATE_FORMAT).ok()?,
        NaiveDate::parse_from_str(end, DATE_FORMAT).ok()?,
    )
    .ok()?;
    Some(RangeInvalidation {
        site: site.parse().ok()?,
        range,
        segment: decode_optional(segment)?,
        plugin: decode_optional(plugin)?,
    })
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}

fn encode_optional(value: Option<&str>) -> String {
    value
        .map(|v| urlencoding::encode(v).into_owned())
        .unwrap_or_default()
}

fn decode_optional(field: &str) -> Option<Option<String>> {
    if field.is_empty() {
        return Some(None);
    }
    urlencoding::decode(field).ok().map(|v| Some(v.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_marker_key_encoding() {
        let key = ArchiveKey::new(7, PeriodKind::Week, date("2024-01-01"), None, None);
        assert_eq!(encode_marker_key(&key), b"marker:0000000007:week:2024-01-01::");
        assert_eq!(decode_marker_key(&encode_marker_key(&key)), Some(key));
    }

    #[test]
    fn test_marker_key_escapes_segment() {
        let key = ArchiveKey::new(
            1,
            PeriodKind::Day,
            date("2024-01-05"),
            Some("referrerUrl=@http://a.b;visitCount>=2"),
            Some("Actions.getPageUrls"),
        );
        let raw = encode_marker_key(&key);
        let text = String::from_utf8(raw.clone()).unwrap();
        assert_eq!(text.matches(':').count(), 5);
        assert_eq!(decode_marker_key(&raw), Some(key));
    }

    #[test]
    fn test_site_prefix() {
        let key = ArchiveKey::new(12, PeriodKind::Year, date("2024-01-01"), None, None);
        assert!(encode_marker_key(&key).starts_with(&encode_site_prefix(12)));
        assert!(!encode_marker_key(&key).starts_with(&encode_site_prefix(1)));
    }

    #[test]
    fn test_range_key_encoding() {
        let range = RangeInvalidation::new(
            3,
            DateRange::new(date("2024-02-01"), date("2024-02-10")).unwrap(),
            Some("browserCode==ff"),
            None,
        );
        let raw = encode_range_key(&range);
        assert!(raw.starts_with(b"range:0000000003:2024-02-01:2024-02-10:"));
        assert_eq!(decode_range_key(&raw), Some(range));
    }

    #[test]
    fn test_malformed_keys() {
        assert_eq!(decode_marker_key(b"marker:1:week"), None);
        assert_eq!(decode_marker_key(b"range:1:2024-01-01:2024-01-02::"), None);
        assert_eq!(decode_range_key(b"range:1:2024-01-05:2024-01-02::"), None);
    }

    #[test]
    fn test_meta_key_encoding() {
        assert_eq!(encode_meta_key("last_prune_ranges"), b"meta:last_prune_ranges");
    }
}

//! Post-assembly trace adjusters
//!
//! Each adjuster is a pure `Trace -> (Trace, warnings)` function. [`adjust`]
//! folds them left to right in a fixed order. Every adjuster is idempotent,
//! so adjusting an adjusted trace is a no-op.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use crate::domain::jaeger::error::AssemblyWarning;
use crate::domain::jaeger::model::{KeyValue, RefType, Reference, TagValue, Trace};

pub type AdjusterFn = fn(Trace) -> (Trace, Vec<AssemblyWarning>);

/// Tag keys whose values are IP addresses
pub const IP_TAG_KEYS: &[&str] = &[
    "ip",
    "peer.ipv4",
    "peer.ipv6",
    "client.address",
    "server.address",
    "net.peer.ip",
    "net.host.ip",
];

/// Log field sorted ahead of all others
const EVENT_FIELD: &str = "event";

/// Adjusters in application order
pub const ADJUSTERS: &[(&str, AdjusterFn)] = &[
    ("span-id-deduper", dedupe_span_ids),
    ("ip-tag-normalizer", normalize_ip_tags),
    ("log-field-sorter", sort_log_fields),
    ("span-reference-repair", repair_span_references),
];

/// Run every adjuster, collecting warnings along the way
pub fn adjust(trace: Trace) -> (Trace, Vec<AssemblyWarning>) {
    ADJUSTERS
        .iter()
        .fold((trace, Vec::new()), |(trace, mut warnings), (name, adjuster)| {
            let (trace, found) = adjuster(trace);
            if !found.is_empty() {
                tracing::debug!(adjuster = name, warnings = found.len(), "Adjuster reported warnings");
            }
            warnings.extend(found);
            (trace, warnings)
        })
}

fn warning(adjuster: &'static str, message: String) -> AssemblyWarning {
    AssemblyWarning::Adjusted { adjuster, message }
}

// ============================================================================
// Span ID Deduplication
// ============================================================================

/// Give every repeated span id a fresh id
///
/// The first span keeps the id. Later spans get an unused 16-hex-digit id and
/// a child-of reference to the span they collided with.
pub fn dedupe_span_ids(mut trace: Trace) -> (Trace, Vec<AssemblyWarning>) {
    let mut seen: HashSet<String> = HashSet::with_capacity(trace.spans.len());
    let duplicates: Vec<usize> = trace
        .spans
        .iter()
        .enumerate()
        .filter(|(_, span)| !seen.insert(span.span_id.clone()))
        .map(|(i, _)| i)
        .collect();
    if duplicates.is_empty() {
        return (trace, Vec::new());
    }

    let mut next = seen
        .iter()
        .filter_map(|id| u64::from_str_radix(id, 16).ok())
        .max()
        .unwrap_or(0);
    let mut warnings = Vec::new();

    for index in duplicates {
        let fresh = loop {
            let Some(candidate) = next.checked_add(1) else {
                break None;
            };
            next = candidate;
            let id = format!("{:016x}", candidate);
            if !seen.contains(&id) {
                break Some(id);
            }
        };
        let span = &mut trace.spans[index];
        let Some(fresh) = fresh else {
            warnings.push(warning(
                "span-id-deduper",
                format!("cannot allocate a new id for duplicate span {}", span.span_id),
            ));
            continue;
        };

        let original = std::mem::replace(&mut span.span_id, fresh.clone());
        span.references.push(Reference {
            ref_type: RefType::ChildOf,
            trace_id: span.trace_id.clone(),
            span_id: original.clone(),
        });
        seen.insert(fresh.clone());
        warnings.push(warning(
            "span-id-deduper",
            format!("duplicate span id {} reassigned to {}", original, fresh),
        ));
    }
    (trace, warnings)
}

// ============================================================================
// IP Tag Normalization
// ============================================================================

fn normalize_ip(value: &TagValue) -> Option<TagValue> {
    let rendered = match value {
        TagValue::Int64(n) => u32::try_from(*n).ok().map(|n| Ipv4Addr::from(n).to_string()),
        TagValue::String(s) => {
            let s = s.trim();
            match s.parse::<IpAddr>() {
                Ok(ip) => Some(ip.to_string()),
                Err(_) => s.parse::<u32>().ok().map(|n| Ipv4Addr::from(n).to_string()),
            }
        }
        _ => None,
    }?;
    let normalized = TagValue::String(rendered);
    (normalized != *value).then_some(normalized)
}

fn normalize_tag_list(tags: &mut [KeyValue]) -> usize {
    let mut changed = 0;
    for tag in tags.iter_mut() {
        if !IP_TAG_KEYS.contains(&tag.key.as_str()) {
            continue;
        }
        if let Some(value) = normalize_ip(&tag.value) {
            *tag = KeyValue::new(std::mem::take(&mut tag.key), value);
            changed += 1;
        }
    }
    changed
}

/// Render IP-valued tags as canonical address strings
pub fn normalize_ip_tags(mut trace: Trace) -> (Trace, Vec<AssemblyWarning>) {
    let mut changed = 0;
    for span in &mut trace.spans {
        changed += normalize_tag_list(&mut span.tags);
        changed += normalize_tag_list(&mut span.process.tags);
    }
    if changed > 0 {
        tracing::trace!(trace_id = %trace.trace_id, changed, "Normalized IP tags");
    }
    (trace, Vec::new())
}

// ============================================================================
// Log Field Sorting
// ============================================================================

/// Order log fields with `event` first, then by key
pub fn sort_log_fields(mut trace: Trace) -> (Trace, Vec<AssemblyWarning>) {
    for span in &mut trace.spans {
        for log in &mut span.logs {
            log.fields
                .sort_by(|a, b| (a.key != EVENT_FIELD, &a.key).cmp(&(b.key != EVENT_FIELD, &b.key)));
        }
    }
    (trace, Vec::new())
}

// ============================================================================
// Reference Repair
// ============================================================================

/// Make references internally consistent
///
/// Drops references without a target span and references to the span
/// itself, fills a missing target trace id with the span's own, and removes
/// exact duplicates.
pub fn repair_span_references(mut trace: Trace) -> (Trace, Vec<AssemblyWarning>) {
    let mut warnings = Vec::new();
    for span in &mut trace.spans {
        let mut kept: Vec<Reference> = Vec::with_capacity(span.references.len());
        for mut reference in std::mem::take(&mut span.references) {
            if reference.span_id.is_empty() {
                warnings.push(warning(
                    "span-reference-repair",
                    format!("span {} has a reference without a span id", span.span_id),
                ));
                continue;
            }
            if reference.trace_id.is_empty() {
                reference.trace_id = span.trace_id.clone();
            }
            if reference.span_id == span.span_id && reference.trace_id == span.trace_id {
                warnings.push(warning(
                    "span-reference-repair",
                    format!("span {} references itself", span.span_id),
                ));
                continue;
            }
            if !kept.contains(&reference) {
                kept.push(reference);
            }
        }
        span.references = kept;
    }
    (trace, warnings)
}

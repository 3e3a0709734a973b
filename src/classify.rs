use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{MetadataField, MetadataRecord, is_valid_sample_id};
use crate::report::WarningIndex;

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

pub fn is_valid_date(value: &str) -> bool {
    DATE_FORMAT.is_match(value)
}

/// Required fields of `record` that are empty or absent.
pub fn missing_required(record: &MetadataRecord) -> Option<BTreeSet<MetadataField>> {
    let missing: BTreeSet<MetadataField> = MetadataField::REQUIRED
        .into_iter()
        .filter(|field| match field {
            MetadataField::PrivateId => record.private_id.is_empty(),
            MetadataField::CollectionDate => is_blank(record.collection_date.as_deref()),
            MetadataField::CollectionLocation => record.collection_location.is_none(),
            _ => false,
        })
        .collect();
    (!missing.is_empty()).then_some(missing)
}

/// Present fields of `record` whose value has the wrong shape.
pub fn bad_format(record: &MetadataRecord) -> Option<BTreeSet<MetadataField>> {
    let mut bad = BTreeSet::new();
    if !record.private_id.is_empty() && !is_valid_sample_id(&record.private_id) {
        bad.insert(MetadataField::PrivateId);
    }
    for (field, value) in [
        (MetadataField::CollectionDate, &record.collection_date),
        (MetadataField::SequencingDate, &record.sequencing_date),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty())
            && !is_valid_date(value)
        {
            bad.insert(field);
        }
    }
    (!bad.is_empty()).then_some(bad)
}

/// Cross-checks sample IDs from sequence files against those from the
/// metadata file: metadata rows without a sequence are `EXTRANEOUS_ENTRY`,
/// sequences without a metadata row are `ABSENT_SAMPLE`.
pub fn reconcile<'a>(
    sequence_ids: impl IntoIterator<Item = &'a String>,
    metadata_ids: impl IntoIterator<Item = &'a String>,
) -> WarningIndex {
    let sequences: BTreeSet<&String> = sequence_ids.into_iter().collect();
    let metadata: BTreeSet<&String> = metadata_ids.into_iter().collect();

    let mut warnings = WarningIndex::new();
    warnings.add_extraneous_entries(metadata.difference(&sequences).map(|id| (*id).clone()));
    warnings.add_absent_samples(sequences.difference(&metadata).map(|id| (*id).clone()));
    warnings
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::CanonicalLocation;

    fn complete_record() -> MetadataRecord {
        let mut record = MetadataRecord::new("sample-1");
        record.collection_date = Some("2021-03-04".to_string());
        record.collection_location = Some(Arc::new(CanonicalLocation::new(
            1,
            Some("Europe".to_string()),
            None,
            None,
            None,
        )));
        record
    }

    #[test]
    fn complete_record_has_no_flags() {
        let record = complete_record();
        assert_eq!(missing_required(&record), None);
        assert_eq!(bad_format(&record), None);
    }

    #[test]
    fn blank_date_is_missing_not_malformed() {
        let mut record = complete_record();
        record.collection_date = Some("  ".to_string());
        record.collection_location = None;
        assert_eq!(
            missing_required(&record),
            Some(BTreeSet::from([
                MetadataField::CollectionDate,
                MetadataField::CollectionLocation
            ]))
        );
    }

    #[test]
    fn malformed_fields() {
        let mut record = complete_record();
        record.private_id = "bad#id".to_string();
        record.collection_date = Some("03/04/2021".to_string());
        record.sequencing_date = Some("2021-3-4".to_string());
        assert_eq!(
            bad_format(&record),
            Some(BTreeSet::from([
                MetadataField::PrivateId,
                MetadataField::CollectionDate,
                MetadataField::SequencingDate
            ]))
        );
    }
}

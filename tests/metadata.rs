mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;

use pathogen_upload::domain::{CanonicalLocation, MetadataField};
use pathogen_upload::location::LocationResolver;
use pathogen_upload::metadata::{HeaderMap, MetadataParseResult, parse_tabular};
use pathogen_upload::report::{ErrorCode, ParseError, Warning, WarningCode};

use common::reference_locations;

const TEMPLATE_CSV: &str = "\
Sample Private ID,Sample Public ID,Collection Date,Collection Location,Sequencing Date,Sample is Private,Lineage
# Example rows below are part of the template
example-row,,2020-01-01,Alameda County,,No,
s1,PUB-1,2021-01-02,Alameda County,2021-01-05,Yes,B.1
s2,,2021/01/02,,,maybe,
\"s3\",,2021-01-03,\"Alameda, County\",,no,
,,2021-01-04,Alameda County,,,
s4,,2021-01-04,CA,,,
";

fn parse(filename: &str, text: &str) -> MetadataParseResult {
    let resolver = LocationResolver::new(reference_locations());
    let mut cache = resolver.new_cache();
    let ignored = BTreeSet::from(["example-row".to_string()]);
    parse_tabular(
        filename,
        text.as_bytes(),
        &HeaderMap::template(),
        &MetadataField::REQUIRED,
        |raw| resolver.resolve(raw, Some(&mut cache)),
        &ignored,
    )
    .unwrap()
}

fn fields(items: &[MetadataField]) -> BTreeSet<MetadataField> {
    items.iter().copied().collect()
}

#[test]
fn rows_become_records() {
    let result = parse("metadata.csv", TEMPLATE_CSV);

    assert_eq!(result.filename, "metadata.csv");
    assert!(result.error_index.is_empty());
    assert_eq!(
        result.data.keys().cloned().collect::<Vec<_>>(),
        vec!["s1", "s2", "s3", "s4"]
    );

    let s1 = &result.data["s1"];
    assert_eq!(s1.public_id.as_deref(), Some("PUB-1"));
    assert_eq!(s1.collection_date.as_deref(), Some("2021-01-02"));
    assert_eq!(s1.sequencing_date.as_deref(), Some("2021-01-05"));
    assert_eq!(s1.keep_private, Some(true));
    assert_eq!(s1.collection_location.as_ref().map(|loc| loc.id), Some(1));

    let s3 = &result.data["s3"];
    assert_eq!(s3.keep_private, Some(false));
    assert_eq!(s3.collection_location.as_ref().map(|loc| loc.id), Some(1));

    assert_eq!(result.data["s2"].keep_private, None);
    assert_eq!(result.unknown_headers, BTreeSet::from(["Lineage".to_string()]));
}

#[test]
fn row_problems_are_warnings() {
    let result = parse("metadata.csv", TEMPLATE_CSV);
    let warnings = &result.warning_index;

    assert_matches!(
        warnings.get(WarningCode::MissingData),
        Some(Warning::MissingData(map))
            if map.len() == 2
                && map["s2"] == fields(&[MetadataField::CollectionLocation])
                && map["s4"] == fields(&[MetadataField::CollectionLocation])
    );
    assert_matches!(
        warnings.get(WarningCode::BadFormatData),
        Some(Warning::BadFormatData(map))
            if map.len() == 1 && map["s2"] == fields(&[MetadataField::CollectionDate])
    );
    assert_matches!(
        warnings.get(WarningCode::BadLocationFormat),
        Some(Warning::BadLocationFormat(map)) if map.len() == 1 && map.contains_key("s4")
    );
    assert!(!warnings.contains(WarningCode::AutoCorrect));
}

#[test]
fn missing_required_header_is_fatal() {
    let text = "\
Sample Private ID,Collection Location
s1,Alameda County
s2,Alameda County
s3,Alameda County
";
    let result = parse("metadata.csv", text);

    assert!(result.data.is_empty());
    assert!(result.error_index.has_fatal());
    assert_matches!(
        result.error_index.get(ErrorCode::MissingField),
        Some(ParseError::MissingField(missing))
            if *missing == fields(&[MetadataField::CollectionDate])
    );
    assert!(result.warning_index.is_empty());
}

#[test]
fn empty_file_misses_every_required_header() {
    let result = parse("metadata.csv", "");
    assert_matches!(
        result.error_index.get(ErrorCode::MissingField),
        Some(ParseError::MissingField(missing)) if missing.len() == 3
    );
}

#[test]
fn later_duplicate_row_wins_with_its_own_warnings() {
    let text = "\
privateId,collectionDate,collectionLocation
dup,not-a-date,Alameda County
dup,2021-02-03,Alameda County
";
    let result = parse("metadata.csv", text);

    assert_eq!(result.data.len(), 1);
    assert_eq!(
        result.data["dup"].collection_date.as_deref(),
        Some("2021-02-03")
    );
    assert!(result.warning_index.is_empty());
}

#[test]
fn tab_separated_with_custom_headers() {
    let mut header_map = HeaderMap::template();
    header_map.insert("sample_name", MetadataField::PrivateId);
    header_map.insert("date", MetadataField::CollectionDate);
    header_map.insert("where", MetadataField::CollectionLocation);
    let text = "sample_name\tdate\twhere\nt1\t2022-05-06\tSan Francisco County\n";

    let resolver = LocationResolver::new(reference_locations());
    let result = parse_tabular(
        "metadata.tsv",
        text.as_bytes(),
        &header_map,
        &MetadataField::REQUIRED,
        |raw| resolver.resolve(raw, None),
        &BTreeSet::new(),
    )
    .unwrap();

    assert!(result.warning_index.is_empty());
    assert_eq!(
        result.data["t1"].collection_location.as_ref().map(|loc| loc.id),
        Some(2)
    );
}

#[test]
fn short_locations_never_reach_the_resolver() {
    let text = "\
privateId,collectionDate,collectionLocation
a,2021-01-01,US
b,2021-01-01,USA
";
    let mut seen = Vec::new();
    let result = parse_tabular(
        "metadata.csv",
        text.as_bytes(),
        &HeaderMap::new(),
        &MetadataField::REQUIRED,
        |raw| {
            seen.push(raw.to_string());
            Some(Arc::new(CanonicalLocation::new(
                1,
                Some("North America".into()),
                Some(raw.into()),
                None,
                None,
            )))
        },
        &BTreeSet::new(),
    )
    .unwrap();

    assert_eq!(seen, vec!["USA".to_string()]);
    assert!(result.data["a"].collection_location.is_none());
    assert!(result.data["b"].collection_location.is_some());
}

#[test]
fn ragged_rows_degrade_to_warnings() {
    let text = "\
privateId,collectionDate,collectionLocation
a,2021-01-01
b,2021-01-01,Alameda County,extra
\"c,2021-01-01,Alameda County
";
    let result = parse("metadata.csv", text);

    assert!(result.error_index.is_empty());
    // The unterminated quote swallows the rest of the file into one cell.
    assert_eq!(result.data.len(), 3);
    assert!(result.data.contains_key("a") && result.data.contains_key("b"));
    assert_eq!(
        result.data["b"].collection_location.as_ref().map(|loc| loc.id),
        Some(1)
    );
    assert_matches!(
        result.warning_index.get(WarningCode::MissingData),
        Some(Warning::MissingData(map))
            if map["a"] == fields(&[MetadataField::CollectionLocation])
                && !map.contains_key("b")
    );
}

#[test]
fn cells_are_kept_verbatim_except_the_sample_id() {
    let text = "\
 privateId , publicId ,collectionDate,collectionLocation
  s1  , PUB 1 ,2021-01-01,Alameda County
";
    let result = parse("metadata.csv", text);

    let s1 = &result.data["s1"];
    assert_eq!(s1.public_id.as_deref(), Some(" PUB 1 "));
    assert_eq!(s1.collection_date.as_deref(), Some("2021-01-01"));
}

#[test]
fn records_have_fixed_keys() {
    let result = parse("metadata.csv", TEMPLATE_CSV);
    let json = serde_json::to_value(&result.data["s1"]).unwrap();
    let keys: BTreeSet<String> = json.as_object().unwrap().keys().cloned().collect();
    assert_eq!(
        keys,
        BTreeSet::from(
            [
                "privateId",
                "publicId",
                "collectionDate",
                "collectionLocation",
                "sequencingDate",
                "keepPrivate"
            ]
            .map(String::from)
        )
    );
}

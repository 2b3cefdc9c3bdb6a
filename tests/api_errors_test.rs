use miette::Diagnostic;
use nexus_deck::error::{EditError, ExtractError, IncludeError, TableError, UnitError};
use nexus_deck::units::Dimension;
use nexus_deck::writer::modify_line;
use nexus_deck::{
    load_deck, parse_method_str, unit_for, DeckError, Domain, IncludeNode, LineId, LoadOptions,
    LocationIndex, UnitConverter, UnitSystem,
};
use std::path::Path;

#[test]
fn test_malformed_value_names_file_line_and_key() {
    let err = parse_method_str("PREF 2000\nKP 3.O\n", "rock_01.dat", Domain::Rock).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("'3.O'"), "{message}");
    assert!(message.contains("KP"), "{message}");
    assert!(message.contains("rock_01.dat"), "{message}");
    assert!(message.contains("line 1"), "{message}");
    assert_eq!(err.code().unwrap().to_string(), "extract::malformed_value");
    match err {
        DeckError::Extract(ExtractError::MalformedValue { src, span, .. }) => {
            assert_eq!(span.offset(), 3);
            assert!(format!("{src:?}").contains("rock_01.dat"));
        }
        other => panic!("Expected MalformedValue, got {other:?}"),
    }
}

#[test]
fn test_ragged_table_is_reported_with_its_row() {
    let text = "BLACKOIL\nSATURATED\nPRES RS BO\n1000 200 1.2\n2000 400\n";
    let err = parse_method_str(text, "pvt.dat", Domain::Pvt).unwrap_err();
    match &err {
        DeckError::Extract(ExtractError::Table { key, line, source, .. }) => {
            assert_eq!(key, "SATURATED");
            assert_eq!(*line, 4);
            assert_eq!(
                *source,
                TableError::RaggedTable {
                    row: 1,
                    expected: 3,
                    found: 2
                }
            );
        }
        other => panic!("Expected a table error, got {other:?}"),
    }
    assert_eq!(err.code().unwrap().to_string(), "extract::table");
}

#[test]
fn test_missing_entry_file() {
    let err = load_deck(Path::new("/no/such/deck.fcs"), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, DeckError::Include(IncludeError::NotFound { .. })));
    assert_eq!(err.code().unwrap().to_string(), "include::not_found");
    assert!(err.help().is_some());
}

#[test]
fn test_unit_lookup_errors() {
    let err = unit_for("SKIN", UnitSystem::Metric).unwrap_err();
    assert_eq!(
        err,
        UnitError::UnrecognizedAttribute {
            attribute: "SKIN".to_string()
        }
    );
    let strict = UnitConverter::new().convert_strict(
        100.0,
        Dimension::Length,
        UnitSystem::English,
        UnitSystem::Metric,
    );
    assert!(matches!(strict, Err(UnitError::NoConversion { .. })));
    let converted = UnitConverter::default()
        .convert(100.0, "DEPTH", UnitSystem::English, UnitSystem::Metric)
        .unwrap();
    assert!((converted - 30.48).abs() < 1e-9);
}

#[test]
fn test_edit_of_foreign_line_is_rejected() {
    let mut node = IncludeNode::from_source("rock.dat", "PREF 2000\n");
    let mut index = LocationIndex::new();
    let result = modify_line(&mut node, &mut index, LineId::fresh(), "PREF 1");
    assert!(matches!(result, Err(EditError::UnknownLine { .. })));
    assert!(!node.is_modified());
}

#[test]
fn test_unknown_keywords_pass_through() {
    let text = "FUTURE_KEYWORD 12 ON\nPREF 2000\n";
    let result = parse_method_str(text, "rock.dat", Domain::Rock).unwrap();
    assert_eq!(result.properties.keys().collect::<Vec<_>>(), vec!["PREF"]);
    assert!(result.warnings.is_empty());
    assert_eq!(result.location.len(), 2);
}

//! Property-based tests for statement fragments and field conversion using proptest

use proptest::prelude::*;
use rust_record_mapper::prelude::*;
use rust_record_mapper::{Placeholder, Quote};

fn dialect_strategy() -> impl Strategy<Value = Dialect> {
    let quote = prop_oneof![
        Just(Quote::DoubleQuote),
        Just(Quote::Backtick),
        Just(Quote::Bracket),
    ];
    let placeholder = prop_oneof![
        Just(Placeholder::Question),
        Just(Placeholder::NumberedQuestion),
        Just(Placeholder::Dollar),
        Just(Placeholder::AtP),
    ];
    (quote, placeholder, any::<bool>()).prop_map(|(quote, placeholder, use_returning)| Dialect {
        quote,
        placeholder,
        use_returning,
    })
}

/// Undo `Dialect::quoted`
fn unquote(quoted: &str, open: char, close: char) -> Option<String> {
    let inner = quoted.strip_prefix(open)?.strip_suffix(close)?;
    let doubled: String = [close, close].iter().collect();
    Some(inner.replace(&doubled, &close.to_string()))
}

// ============================================================================
// Placeholder Tests
// ============================================================================

proptest! {
    /// Numbered placeholders count up from `start` without gaps
    #[test]
    fn test_dollar_placeholders_are_sequential(count in 0usize..64, start in 1usize..100) {
        let rendered = Dialect::postgres().placeholders(count, start);
        if count == 0 {
            prop_assert_eq!(rendered, "");
        } else {
            let numbers: Vec<usize> = rendered
                .split(',')
                .map(|p| p.trim_start_matches('$').parse().unwrap())
                .collect();
            let expected: Vec<usize> = (start..start + count).collect();
            prop_assert_eq!(numbers, expected);
        }
    }

    /// Every dialect renders exactly `count` placeholders
    #[test]
    fn test_placeholder_count(dialect in dialect_strategy(), count in 1usize..64) {
        let rendered = dialect.placeholders(count, 1);
        prop_assert_eq!(rendered.split(',').count(), count);
        prop_assert_eq!(dialect.placeholder(count), rendered.rsplit(',').next().unwrap());
    }
}

// ============================================================================
// Identifier Quoting Tests
// ============================================================================

proptest! {
    /// Quoting is reversible, including embedded quote characters
    #[test]
    fn test_double_quote_round_trip(ident in "[a-z\"_ ]{1,16}") {
        let quoted = Dialect::sqlite().quoted(&ident);
        prop_assert_eq!(unquote(&quoted, '"', '"'), Some(ident));
    }

    #[test]
    fn test_bracket_round_trip(ident in "[a-z\\]\\[_]{1,16}") {
        let dialect = Dialect { quote: Quote::Bracket, ..Dialect::sqlite() };
        let quoted = dialect.quoted(&ident);
        prop_assert_eq!(unquote(&quoted, '[', ']'), Some(ident));
    }

    /// Each dot-separated segment of a table name is quoted on its own
    #[test]
    fn test_qualified_table_segments(parts in prop::collection::vec("[a-z_]{1,8}", 1..4)) {
        let table = parts.join(".");
        let quoted = Dialect::mysql().quoted_table(&table);
        let segments: Vec<String> = quoted
            .split('.')
            .map(|s| unquote(s, '`', '`').unwrap())
            .collect();
        prop_assert_eq!(segments, parts);
    }
}

// ============================================================================
// Field Conversion Tests
// ============================================================================

proptest! {
    /// Integer fields accept any column value that fits their width
    #[test]
    fn test_i16_field_accepts_in_range(value in any::<i64>()) {
        let mut field: i16 = 0;
        let result = field.set_value("n", DatabaseValue::Long(value));
        if i16::try_from(value).is_ok() {
            prop_assert!(result.is_ok());
            prop_assert_eq!(i64::from(field), value);
        } else {
            let is_mismatch = matches!(result, Err(MapperError::TypeMismatch { .. }));
            prop_assert!(is_mismatch);
            prop_assert_eq!(field, 0);
        }
    }

    /// Unsigned fields refuse values that do not fit a signed 64-bit column
    #[test]
    fn test_u64_field_to_value(value in any::<u64>()) {
        let result = value.to_value();
        if value <= i64::MAX as u64 {
            prop_assert_eq!(result.unwrap(), DatabaseValue::Long(value as i64));
        } else {
            let is_unsupported = matches!(result, Err(MapperError::UnsupportedType(_)));
            prop_assert!(is_unsupported);
        }
    }
}

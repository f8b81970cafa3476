//! End-to-end tests: script source through lexing, parsing, market state
//! and evaluation, plus the CSV adapter feeding a session and round-trip
//! properties of the canonical writer.

mod common;

use common::*;

use algoscript::adapters::csv_feed::CsvFeed;
use algoscript::adapters::synthetic_feed::SyntheticFeed;
use algoscript::domain::ast::EventKind;
use algoscript::domain::session::Session;
use algoscript::domain::validate::{parse_source, validate};
use algoscript::ports::feed_port::CandleFeed;
use algoscript::EXAMPLE_SCRIPT;

mod end_to_end {
    use super::*;

    #[test]
    fn log_statement_reaches_the_result() {
        let source = "SYMBOL \"ETHUSD\"\nTIMEFRAME \"4H\"\nON NEW_CANDLE:\n    LOG \"hi\"\nEND\n";
        let mut session = Session::new(strategy_from(source), 10_000.0);
        feed_closes(&mut session, &[2000.0]);

        let result = session.dispatch(EventKind::NewCandle);
        assert!(result.success);
        assert_eq!(result.logs, vec!["hi"]);
        assert!(result.actions.is_empty());
    }

    #[test]
    fn unconditional_buy_splits_the_balance() {
        let source =
            "SYMBOL \"ETHUSD\"\nTIMEFRAME \"4H\"\nON NEW_CANDLE:\n    BUY 50% OF BALANCE\nEND\n";
        let mut session = Session::new(strategy_from(source), 10_000.0);
        feed_closes(&mut session, &[2000.0]);

        let result = session.dispatch(EventKind::NewCandle);
        assert!(result.success);
        let state = session.trading();
        assert!((state.balance - 5000.0).abs() < 1e-9);
        assert!((state.position_size - 2.5).abs() < 1e-12);
        assert_eq!(state.entry_price, Some(2000.0));
    }

    #[test]
    fn entry_exit_cycle_over_events() {
        let source = "SYMBOL \"ETHUSD\"\nTIMEFRAME \"4H\"\n\
ON NEW_CANDLE:\n    IF PRICE CROSSES EMA(3) UPWARDS\n        BUY 50% OF BALANCE\n\
ON ORDER_FILLED:\n    SET STOP_LOSS AT 5% BELOW ENTRY_PRICE\n\
ON PRICE_CHANGE:\n    IF PRICE IS LESS THAN ENTRY_PRICE\n        SELL 100% OF POSITION\nEND\n";
        let mut session = Session::new(strategy_from(source), 10_000.0);

        // Walk the close under and back over EMA(3): 100,100,100 seeds at
        // 100; 90 pulls the EMA to 95; 120 crosses it upwards at 107.5.
        feed_closes(&mut session, &[100.0, 100.0, 100.0, 90.0]);
        let result = session.dispatch(EventKind::NewCandle);
        assert!(result.actions.is_empty());

        session.ingest(make_candle(4, 120.0)).unwrap();
        let result = session.dispatch(EventKind::NewCandle);
        assert_eq!(result.actions.len(), 1, "cross should trigger the entry");
        let entry = session.trading().entry_price.unwrap();
        assert!((entry - 120.0).abs() < 1e-12);

        let result = session.dispatch(EventKind::OrderFilled);
        assert!(result.success);
        assert!((session.trading().stop_loss.unwrap() - 114.0).abs() < 1e-9);

        // Price drops below entry: PRICE_CHANGE closes the position.
        session.ingest(make_candle(5, 110.0)).unwrap();
        let result = session.dispatch(EventKind::PriceChange);
        assert!(result.success);
        assert_eq!(result.actions.len(), 1);
        let state = session.trading();
        assert_eq!(state.position_size, 0.0);
        assert_eq!(state.entry_price, None);
        assert_eq!(state.stop_loss, None);
    }

    #[test]
    fn insufficient_history_surfaces_the_lookback() {
        let source = "SYMBOL \"ETHUSD\"\nTIMEFRAME \"4H\"\n\
ON NEW_CANDLE:\n    IF PRICE CROSSES EMA(50) UPWARDS\n        LOG \"cross\"\nEND\n";
        let mut session = Session::new(strategy_from(source), 10_000.0);
        feed_closes(&mut session, &[100.0; 10]);

        let result = session.dispatch(EventKind::NewCandle);
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap(),
            "insufficient history for EMA(50): have 10 samples, need 50"
        );
    }

    #[test]
    fn example_script_runs_on_a_synthetic_feed() {
        let parsed = parse_source(EXAMPLE_SCRIPT).unwrap();
        let mut session = Session::new(parsed.strategy, 10_000.0);

        let candles = SyntheticFeed::new(120, 42).candles().unwrap();
        for candle in candles {
            session.ingest(candle).unwrap();
            for event in [
                EventKind::NewCandle,
                EventKind::OrderFilled,
                EventKind::PriceChange,
            ] {
                let result = session.dispatch(event);
                if result.success {
                    assert!(result.error.is_none());
                }
            }
        }
        // The walk is random but the account must stay consistent.
        let state = session.trading();
        assert!(state.balance >= 0.0);
        assert!(state.position_size >= 0.0);
        if state.position_size == 0.0 {
            assert_eq!(state.entry_price, None);
        }
    }
}

mod csv_pipeline {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_feed_drives_a_session() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,100,101,99,100,1000\n\
             2024-01-01T04:00:00Z,100,101,99,100,1000\n\
             2024-01-01T08:00:00Z,100,101,99,100,1000\n\
             2024-01-01T12:00:00Z,90,91,89,90,1000\n\
             2024-01-01T16:00:00Z,120,121,119,120,1000\n"
        )
        .unwrap();

        let source = "SYMBOL \"ETHUSD\"\nTIMEFRAME \"4H\"\n\
ON NEW_CANDLE:\n    IF PRICE CROSSES EMA(3) UPWARDS\n        BUY 50% OF BALANCE\n        LOG \"entered\"\nEND\n";
        let mut session = Session::new(strategy_from(source), 10_000.0);

        let mut logs = Vec::new();
        for candle in CsvFeed::new(file.path()).candles().unwrap() {
            session.ingest(candle).unwrap();
            logs.extend(session.dispatch(EventKind::NewCandle).logs);
        }

        assert_eq!(logs, vec!["entered"]);
        assert!((session.trading().balance - 5000.0).abs() < 1e-9);
    }
}

mod validation {
    use super::*;

    #[test]
    fn example_script_validates_clean() {
        let result = validate(EXAMPLE_SCRIPT);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn syntax_error_is_reported_with_position() {
        let result = validate("SYMBOL \"A\"\nTIMEFRAME \"1H\"\nON NEW_CANDLE:\n    BUY 50% BALANCE\nEND\n");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 4);
        assert!(result.errors[0].message.contains("OF"));
    }

    #[test]
    fn bad_indentation_is_reported() {
        let result = validate(
            "SYMBOL \"A\"\nTIMEFRAME \"1H\"\nON NEW_CANDLE:\n        LOG \"a\"\n    LOG \"b\"\nEND\n",
        );
        assert!(!result.valid);
        assert!(result.errors[0].message.contains("indentation"));
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn writer_output_reparses_to_the_same_tree(
            symbol in "[A-Z]{3,8}",
            period in 1usize..200,
            pct in 1u32..=100,
        ) {
            let source = format!(
                "SYMBOL \"{symbol}\"\nTIMEFRAME \"4H\"\n\
ON NEW_CANDLE:\n    IF PRICE CROSSES EMA({period}) UPWARDS\n        BUY {pct}% OF BALANCE\nEND\n"
            );
            let first = strategy_from(&source);
            let second = strategy_from(&first.to_source());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.to_source(), second.to_source());
        }

        #[test]
        fn buying_fractions_never_overdraws(seed in any::<u64>()) {
            let source = "SYMBOL \"ETHUSD\"\nTIMEFRAME \"4H\"\n\
ON NEW_CANDLE:\n    IF PRICE IS POSITIVE\n        BUY 10% OF BALANCE\nEND\n";
            let mut session = Session::new(strategy_from(source), 10_000.0);
            for candle in SyntheticFeed::new(60, seed).candles().unwrap() {
                session.ingest(candle).unwrap();
                let result = session.dispatch(EventKind::NewCandle);
                prop_assert!(result.success);
                prop_assert!(session.trading().balance >= 0.0);
            }
            prop_assert!(session.trading().position_size > 0.0);
        }
    }
}

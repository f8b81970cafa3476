//! AlgoScript: an English-like language for describing trading strategies.
//!
//! A script names a symbol and timeframe, then attaches statement blocks to
//! market events. The pipeline is lex → layout → parse → evaluate: the
//! [`domain::lexer`] scans tokens and resolves indentation into explicit
//! block delimiters, the [`domain::parser`] builds a [`domain::ast::Strategy`],
//! and the [`domain::interpreter`] runs one event handler against a
//! [`domain::market::MarketSnapshot`], mutating a simulated
//! [`domain::trading::TradingState`].
//!
//! [`domain::session::Session`] wires the three together for callers that
//! just want to feed candles and dispatch events.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

/// A complete sample script exercising every statement form.
pub const EXAMPLE_SCRIPT: &str = r#"# Simple EMA-cross strategy with protective levels.
SYMBOL "ETHUSD"
TIMEFRAME "4H"

ON NEW_CANDLE:
    IF PRICE CROSSES EMA(50) UPWARDS AND MACD_HISTOGRAM IS POSITIVE
        BUY 50% OF BALANCE WITH MARKET_ORDER
        SET STOP_LOSS AT 5% BELOW ENTRY_PRICE
        LOG "Entered long position"

ON ORDER_FILLED:
    SET TAKE_PROFIT AT 10% ABOVE ENTRY_PRICE
    LOG "Order filled"

ON PRICE_CHANGE:
    IF PRICE IS LESS THAN ENTRY_PRICE
        SELL 100% OF POSITION WITH MARKET_ORDER
        LOG "Exited long position"

END
"#;

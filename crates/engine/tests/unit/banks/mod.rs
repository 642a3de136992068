//! Unit tests for the two access engines.

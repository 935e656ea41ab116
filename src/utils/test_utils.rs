//! Shared fixtures for IR tests.

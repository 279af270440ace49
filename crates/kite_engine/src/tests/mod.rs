//! Cross-module workflow tests

mod google_calendar_mock;
mod smoke_tests;

// This file organizes the integration tests into a cohesive test suite.
// Each module tests a specific aspect of the engine:
// - smoke_tests: configuration and wiring checks
// - store_mock: event store persistence against in-memory and failing stores
// - google_calendar_mock: the Google adapter against a local mock HTTP server
// - engine_tests: refresh cycles driven by a mock external source

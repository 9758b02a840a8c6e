//! Integration tests for addrsync-cloud
//!
//! Uses wiremock to simulate the address book service and verifies
//! end-to-end behavior of the REST agent: account resolution, address book
//! create/lookup/delete, and entry uploads.

mod common;

mod test_address_book;
mod test_entries;

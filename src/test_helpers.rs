//! Shared test utilities for the roster test suite.
//!
//! Provides image fixtures, employee builders, a seeded roster over a
//! [`MemoryStore`], and order assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let roster = seeded_roster(&["Ana", "Bia", "Caio"]);
//! let bia = find_employee(&roster.employees(), "Bia").id.clone();
//! roster.delete(&bia).unwrap();
//!
//! assert_eq!(names(&roster.employees()), vec!["Ana", "Caio"]);
//! assert_dense(&roster.employees());
//! ```

use crate::config::RosterConfig;
use crate::employee::{Employee, EmployeeFields, new_document_fields};
use crate::photo::PhotoRef;
use crate::roster::Roster;
use crate::store::{DocumentStore, MemoryStore};
use chrono::Utc;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

// =========================================================================
// Image fixtures
// =========================================================================

/// Gradient PNG: pixel `(x, y)` is `[x % 256, y % 256, 128]`.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode_gradient(width, height, ImageFormat::Png)
}

/// Same gradient as [`create_test_png`], JPEG encoded.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_gradient(width, height, ImageFormat::Jpeg)
}

fn encode_gradient(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

// =========================================================================
// Employee builders
// =========================================================================

/// Valid editable fields for an employee called `name`.
pub fn fields(name: &str) -> EmployeeFields {
    EmployeeFields {
        name: name.to_string(),
        role: "Consultor de crédito".to_string(),
        description: format!("{name} atende clientes de consignado."),
        photo: PhotoRef::Placeholder,
    }
}

/// Bare employee with the given id and order; name equals id.
pub fn employee(id: &str, order: Option<u32>) -> Employee {
    Employee {
        id: id.to_string(),
        name: id.to_string(),
        role: String::new(),
        description: String::new(),
        photo: PhotoRef::Placeholder,
        order,
        created_at: None,
    }
}

/// Roster over a memory store holding `names` at orders `0..N-1`, already
/// loaded.
pub fn seeded_roster(names: &[&str]) -> Roster<MemoryStore> {
    let config = RosterConfig::default();
    let store = MemoryStore::new(config.store.max_document_bytes);
    for (order, name) in names.iter().enumerate() {
        let doc = new_document_fields(
            &fields(name),
            order as u32,
            Utc::now(),
            &config.placeholder_url,
        );
        store.add(doc).unwrap();
    }
    let roster = Roster::new(store, &config);
    roster.list_all().unwrap();
    roster
}

// =========================================================================
// Lookups and extractors
// =========================================================================

/// Find an employee by name. Panics if not found.
pub fn find_employee<'a>(employees: &'a [Employee], name: &str) -> &'a Employee {
    employees
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| {
            let all = names(employees);
            panic!("employee '{name}' not found. Available: {all:?}")
        })
}

pub fn names(employees: &[Employee]) -> Vec<&str> {
    employees.iter().map(|e| e.name.as_str()).collect()
}

pub fn ids(employees: &[Employee]) -> Vec<&str> {
    employees.iter().map(|e| e.id.as_str()).collect()
}

pub fn orders(employees: &[Employee]) -> Vec<Option<u32>> {
    employees.iter().map(|e| e.order).collect()
}

/// Assert orders are exactly `0..N-1` in sequence.
pub fn assert_dense(employees: &[Employee]) {
    let expected: Vec<Option<u32>> = (0..employees.len() as u32).map(Some).collect();
    assert_eq!(
        orders(employees),
        expected,
        "orders not dense for {:?}",
        names(employees)
    );
}

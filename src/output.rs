//! CLI output formatting.
//!
//! # Listing
//!
//! Employees are shown in display order. The header carries the 1-based
//! position, name and role; details are indented underneath:
//!
//! ```text
//! 001 Ana Souza · Consultora
//!     Order: 0
//!     Photo: image/png (84 KB)
//!     Created: 2024-05-01 12:00 UTC
//!     Description: Especialista em crédito consignado.
//!     Id: 1f0c…
//! ```
//!
//! A record without a stored order shows `Order: N/A`.
//!
//! # Notices
//!
//! Every failure the user can act on becomes a [`Notice`]: a short title
//! plus one sentence telling them what to do.
//!
//! ```text
//! error: Photo too large
//!     The record exceeds the store's size limit. Crop a smaller area or pick a smaller image.
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout or stderr.
//! Format functions are pure.

use crate::capture::CaptureError;
use crate::crop::CropError;
use crate::employee::Employee;
use crate::imaging::EncodedPhoto;
use crate::roster::RosterError;
use crate::store::{StoreError, StoreErrorKind};
use std::fmt;

const DESCRIPTION_PREVIEW: usize = 60;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// Employee listing
// ============================================================================

pub fn format_employee(position: usize, employee: &Employee) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} · {}",
        format_index(position),
        employee.name,
        employee.role
    )];
    let order = employee
        .order
        .map_or_else(|| "N/A".to_string(), |o| o.to_string());
    lines.push(format!("{}Order: {}", indent(1), order));
    lines.push(format!("{}Photo: {}", indent(1), employee.photo.describe()));
    if let Some(created) = employee.created_at {
        lines.push(format!(
            "{}Created: {}",
            indent(1),
            created.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    if !employee.description.is_empty() {
        lines.push(format!(
            "{}Description: {}",
            indent(1),
            truncate_desc(&employee.description, DESCRIPTION_PREVIEW)
        ));
    }
    lines.push(format!("{}Id: {}", indent(1), employee.id));
    lines
}

pub fn format_employees(employees: &[Employee]) -> Vec<String> {
    if employees.is_empty() {
        return vec!["No employees yet".to_string()];
    }
    let mut lines = Vec::new();
    for (i, employee) in employees.iter().enumerate() {
        lines.extend(format_employee(i + 1, employee));
    }
    lines.push(String::new());
    lines.push(match employees.len() {
        1 => "1 employee".to_string(),
        n => format!("{n} employees"),
    });
    lines
}

pub fn print_employees(employees: &[Employee]) {
    for line in format_employees(employees) {
        println!("{}", line);
    }
}

/// Summary of an applied crop.
pub fn format_photo(photo: &EncodedPhoto) -> Vec<String> {
    vec![
        format!("Cropped {}x{}", photo.width, photo.height),
        format!("{}Type: {}", indent(1), photo.data_url.mime_type()),
        format!("{}Size: {} KB", indent(1), photo.len() / 1024),
    ]
}

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A user-facing message with a title and an actionable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn new(severity: Severity, title: &str, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.to_string(),
            description: description.into(),
        }
    }
}

pub fn notice_for(err: &RosterError) -> Notice {
    match err {
        RosterError::Validation(e) => Notice::new(Severity::Warning, "Invalid data", e.to_string()),
        RosterError::Busy => Notice::new(
            Severity::Info,
            "Please wait",
            "Another change is still being saved.",
        ),
        RosterError::Fetch(e) => fetch_notice(e),
        RosterError::Write(e) => write_notice(e),
    }
}

fn fetch_notice(err: &StoreError) -> Notice {
    match err.kind {
        StoreErrorKind::PermissionDenied => Notice::new(
            Severity::Error,
            "Could not load team",
            "Read access was denied. Check the store's access rules.",
        ),
        _ => Notice::new(
            Severity::Error,
            "Could not load team",
            format!("{} (code: {})", err.message, err.code),
        ),
    }
}

fn write_notice(err: &StoreError) -> Notice {
    match err.kind {
        StoreErrorKind::PayloadTooLarge => Notice::new(
            Severity::Error,
            "Photo too large",
            "The record exceeds the store's size limit. Crop a smaller area or pick a smaller image.",
        ),
        StoreErrorKind::PermissionDenied => Notice::new(
            Severity::Error,
            "Permission denied",
            "Write access was denied. Check the store's access rules.",
        ),
        StoreErrorKind::Conflict => Notice::new(
            Severity::Warning,
            "Team changed elsewhere",
            "The list was reloaded from the store. Review it and try again.",
        ),
        StoreErrorKind::NotFound => Notice::new(
            Severity::Warning,
            "Employee not found",
            "It may have been removed already. Reload the list.",
        ),
        StoreErrorKind::Unavailable => Notice::new(
            Severity::Error,
            "Store unavailable",
            format!("{} Try again in a moment.", err.message),
        ),
        StoreErrorKind::Unknown => Notice::new(
            Severity::Error,
            "Could not save",
            format!("{} (code: {})", err.message, err.code),
        ),
    }
}

pub fn notice_for_capture(err: &CaptureError) -> Notice {
    match err {
        CaptureError::TooLarge { limit, .. } => Notice::new(
            Severity::Warning,
            "File too large",
            format!("Pick an image of at most {} KB.", limit / 1024),
        ),
        CaptureError::NotAnImage { media_type } => Notice::new(
            Severity::Warning,
            "Invalid file type",
            format!("`{media_type}` is not an image. Pick a JPG, PNG or WebP file."),
        ),
        other => Notice::new(Severity::Error, "Could not read image", other.to_string()),
    }
}

pub fn notice_for_crop(err: &CropError) -> Notice {
    match err {
        CropError::TooSmall { min, .. } => Notice::new(
            Severity::Warning,
            "Crop area too small",
            format!("Select at least {min}x{min} pixels of the original image."),
        ),
        CropError::NoSelection => Notice::new(
            Severity::Warning,
            "Nothing selected",
            "Select a crop area first.",
        ),
        other => Notice::new(Severity::Error, "Could not crop image", other.to_string()),
    }
}

/// Advisory shown when an applied crop is above the soft size limit.
pub fn notice_for_oversize(photo: &EncodedPhoto) -> Option<Notice> {
    photo.oversize.then(|| {
        Notice::new(
            Severity::Warning,
            "Large photo",
            format!(
                "The cropped photo is {} KB. Saving may fail; a smaller crop is safer.",
                photo.len() / 1024
            ),
        )
    })
}

pub fn format_notice(notice: &Notice) -> Vec<String> {
    vec![
        format!("{}: {}", notice.severity, notice.title),
        format!("{}{}", indent(1), notice.description),
    ]
}

pub fn print_notice(notice: &Notice) {
    for line in format_notice(notice) {
        eprintln!("{}", line);
    }
}

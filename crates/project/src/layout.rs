// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Catalog Vault.
//
// Catalog Vault is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Catalog Vault is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Catalog Vault. If not, see <https://www.gnu.org/licenses/>.

//! Blob layout for a project.
//!
//! ```text
//! projects/{project_id}/images/{image_name}
//! projects/{project_id}/products_data.json
//! projects/{project_id}/{spreadsheet_filename}
//! ```

use crate::{ProjectError, ProjectResult};

/// Filename of the offloaded product payload.
pub const PAYLOAD_FILENAME: &str = "products_data.json";

/// `projects/{project_id}/`, trailing slash included.
pub fn project_prefix(project_id: &str) -> String {
    format!("projects/{}/", project_id)
}

pub fn image_path(project_id: &str, filename: &str) -> String {
    format!("projects/{}/images/{}", project_id, filename)
}

pub fn payload_path(project_id: &str) -> String {
    format!("projects/{}/{}", project_id, PAYLOAD_FILENAME)
}

pub fn spreadsheet_path(project_id: &str, filename: &str) -> String {
    format!("projects/{}/{}", project_id, filename)
}

/// True if `path` lives under the project's prefix.
pub fn is_project_path(project_id: &str, path: &str) -> bool {
    path.starts_with(&project_prefix(project_id))
}

/// Project ids become path segments and document ids.
pub fn validate_project_id(project_id: &str) -> ProjectResult<()> {
    validate_segment("project id", project_id)
}

/// Filenames become a single path segment.
pub fn validate_filename(filename: &str) -> ProjectResult<()> {
    validate_segment("filename", filename)?;
    if filename == PAYLOAD_FILENAME {
        return Err(ProjectError::InvalidInput(format!(
            "filename '{}' is reserved",
            filename
        )));
    }
    Ok(())
}

fn validate_segment(label: &str, value: &str) -> ProjectResult<()> {
    if value.trim().is_empty() {
        return Err(ProjectError::InvalidInput(format!("{} cannot be empty", label)));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." || value.contains('\0') {
        return Err(ProjectError::InvalidInput(format!(
            "{} '{}' is not a valid path segment",
            label, value
        )));
    }
    Ok(())
}

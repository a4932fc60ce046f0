// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File utilities: checksums, batch renaming, duplicate detection

pub mod duplicates;
pub mod hasher;
pub mod rename;

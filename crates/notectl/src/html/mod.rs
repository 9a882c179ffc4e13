// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! HTML in and out of the document model: the serializer (C9), the CSS
//! class-extraction mode, the sanitizer allow-list, and (behind the `sys`
//! feature, since it needs a real HTML tokenizer) the parser/source
//! normalizer (C10).

pub mod css_extract;
pub mod sanitize;
pub mod serializer;

#[cfg(feature = "sys")]
pub mod parser;

pub use css_extract::{serialize_document_to_css, CssExtraction};
pub use serializer::{serialize_block, serialize_document};

#[cfg(feature = "sys")]
pub use parser::{parse_html, ContentSlice, HtmlSource};

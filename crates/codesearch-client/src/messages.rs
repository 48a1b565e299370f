//! Request and response shapes for the code search JSON endpoint.
//!
//! Every message tolerates missing fields (they take their defaults) and
//! ignores fields it does not know. Sub-lists of [`CompoundRequest`] and
//! [`CompoundResponse`] are `Option`: `None` means "not requested" or "not
//! returned", which is different from an empty list.

use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::fingerprint::Request;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Edge type used to filter cross-reference searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeKind(pub u32);

impl EdgeKind {
    pub const EXTENDS: Self = Self(100);
    pub const EXTENDED_BY: Self = Self(200);
    pub const DECLARES: Self = Self(300);
    pub const DECLARED_BY: Self = Self(400);
    pub const OVERRIDES: Self = Self(700);
    pub const OVERRIDDEN_BY: Self = Self(800);
    pub const DIRECTLY_OVERRIDES: Self = Self(850);
    pub const DIRECTLY_OVERRIDDEN_BY: Self = Self(860);
    pub const CALL: Self = Self(2200);
    pub const CALLED_AT: Self = Self(2300);
    pub const INSTANTIATION: Self = Self(2400);
    pub const INSTANTIATED_AT: Self = Self(2500);
    pub const REFERENCE: Self = Self(2600);
    pub const REFERENCED_AT: Self = Self(2700);
    pub const DECLARATION_OF: Self = Self(3200);
    pub const HAS_DECLARATION: Self = Self(3300);
    pub const DEFINITION_OF: Self = Self(3400);
    pub const HAS_DEFINITION: Self = Self(3500);

    /// Every named edge kind, in numeric order.
    pub const ALL: &'static [Self] = &[
        Self::EXTENDS,
        Self::EXTENDED_BY,
        Self::DECLARES,
        Self::DECLARED_BY,
        Self::OVERRIDES,
        Self::OVERRIDDEN_BY,
        Self::DIRECTLY_OVERRIDES,
        Self::DIRECTLY_OVERRIDDEN_BY,
        Self::CALL,
        Self::CALLED_AT,
        Self::INSTANTIATION,
        Self::INSTANTIATED_AT,
        Self::REFERENCE,
        Self::REFERENCED_AT,
        Self::DECLARATION_OF,
        Self::HAS_DECLARATION,
        Self::DEFINITION_OF,
        Self::HAS_DEFINITION,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSpec {
    pub name: String,
    pub package_name: String,

    /// Last known commit.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub changelist: String,
}

impl FileSpec {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_name: package_name.into(),
            changelist: String::new(),
        }
    }
}

/// A range in a source file. Lines and columns are 1-based and inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl TextRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn contains(&self, line: u32, column: u32) -> bool {
        !(line < self.start_line
            || line > self.end_line
            || (line == self.start_line && column < self.start_column)
            || (line == self.end_line && column > self.end_column))
    }

    /// An all-zero range means the server did not send one.
    pub fn is_valid(&self) -> bool {
        *self != Self::default()
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationType {
    pub id: u32,
}

impl AnnotationType {
    pub const UNKNOWN: u32 = 0x00000;
    pub const LINK_TO_DEFINITION: u32 = 0x00001;
    pub const LINK_TO_URL: u32 = 0x00002;
    pub const XREF_SIGNATURE: u32 = 0x00004;
    pub const COVERAGE: u32 = 0x00010;
    pub const LINT: u32 = 0x00020;
    pub const BLAME: u32 = 0x00040;
    pub const COMPILER: u32 = 0x00080;
    pub const OVERRIDE: u32 = 0x01000;
    pub const DEPRECATED: u32 = 0x02000;

    pub fn new(id: u32) -> Self {
        Self { id }
    }
}

/// Space-separated signature lists, `signature` first.
fn split_signatures<'a>(signature: &'a str, highlight: &'a str) -> Vec<&'a str> {
    signature
        .split(' ')
        .chain(highlight.split(' '))
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalLink {
    pub package_name: String,
    pub path: String,
    pub signature: String,
    pub highlight_signature: String,
    pub range: TextRange,
}

impl InternalLink {
    pub fn signatures(&self) -> Vec<&str> {
        split_signatures(&self.signature, &self.highlight_signature)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefSignature {
    pub signature: String,
    pub highlight_signature: String,
}

impl XrefSignature {
    pub fn signatures(&self) -> Vec<&str> {
        split_signatures(&self.signature, &self.highlight_signature)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    pub range: TextRange,
    pub content: String,
    pub file_name: String,
    pub url: String,
    pub status: i32,
    pub is_implicit_target: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_link: Option<InternalLink>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub xref_signature: Option<XrefSignature>,
}

impl Annotation {
    /// All signatures carried by a definition link or xref annotation.
    pub fn signatures(&self) -> Vec<&str> {
        match self.kind.id {
            AnnotationType::LINK_TO_DEFINITION => self
                .internal_link
                .as_ref()
                .map(InternalLink::signatures)
                .unwrap_or_default(),
            AnnotationType::XREF_SIGNATURE => self
                .xref_signature
                .as_ref()
                .map(XrefSignature::signatures)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// The primary signature, if any.
    pub fn signature(&self) -> Option<&str> {
        self.signatures().into_iter().next()
    }

    pub fn matches_signature(&self, signature: &str) -> bool {
        self.signatures().contains(&signature)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationRequest {
    pub file_spec: FileSpec,

    #[serde(rename = "type")]
    pub types: Vec<AnnotationType>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub md5: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationResponse {
    pub annotation: Vec<Annotation>,
    pub max_findings_reached: bool,
    pub return_code: i32,
}

// ---------------------------------------------------------------------------
// File info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatedText {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    pub name: String,
    pub package_name: String,
    pub actual_name: String,
    pub changelist_num: String,
    pub language: String,
    pub mime_type: String,
    pub md5: String,
    pub lines: u32,
    pub size: u64,
    pub generated: bool,
    pub generated_from: Vec<String>,
    pub content: AnnotatedText,
}

impl FileInfo {
    pub fn file_spec(&self) -> FileSpec {
        FileSpec::new(self.name.clone(), self.package_name.clone())
    }

    /// Text covered by `range`, with line breaks normalised to `\n`.
    ///
    /// Returns `None` when the range falls outside the fetched content.
    pub fn text(&self, range: &TextRange) -> Option<String> {
        let lines: Vec<&str> = self.content.text.lines().collect();
        let (start, end) = (range.start_line as usize, range.end_line as usize);
        if start == 0 || end == 0 || start > end || end > lines.len() {
            return None;
        }

        let start_col = (range.start_column as usize).saturating_sub(1);
        let end_col = range.end_column as usize;

        if start == end {
            return lines[start - 1].get(start_col..end_col).map(str::to_string);
        }

        let mut parts = Vec::with_capacity(end - start + 1);
        parts.push(lines[start - 1].get(start_col..)?);
        parts.extend(&lines[start..end - 1]);
        let last = lines[end - 1];
        parts.push(last.get(..end_col.min(last.len()))?);
        Some(parts.join("\n"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfoRequest {
    pub file_spec: FileSpec,

    #[serde(skip_serializing_if = "is_false")]
    pub fetch_html_content: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub fetch_outline: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub fetch_folding: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub fetch_generated_from: bool,
}

impl FileInfoRequest {
    pub fn new(file_spec: FileSpec) -> Self {
        Self {
            file_spec,
            ..Self::default()
        }
    }

    /// Plain requests (no optional extras) have stable answers per path.
    pub fn is_plain(&self) -> bool {
        !(self.fetch_html_content
            || self.fetch_outline
            || self.fetch_folding
            || self.fetch_generated_from)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfoResponse {
    pub announcement: String,
    pub error_message: String,
    pub return_code: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_RESULTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub max_num_results: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_context: Option<u32>,

    #[serde(skip_serializing_if = "is_false")]
    pub exhaustive: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub return_directories: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub return_line_matches: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub return_snippets: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub return_all_snippets: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub return_all_duplicates: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_num_results: DEFAULT_MAX_RESULTS,
            lines_context: None,
            exhaustive: false,
            return_directories: false,
            return_line_matches: false,
            return_snippets: false,
            return_all_snippets: false,
            return_all_duplicates: false,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_max_results(mut self, max: u32) -> Self {
        self.max_num_results = max;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleMatch {
    pub line_number: u32,
    pub line_text: String,
    pub match_offset: u32,
    pub match_length: u32,
    pub pre_context_text: String,
    pub post_context_text: String,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResult {
    pub file: FileSpec,
    pub size: u64,
    pub license_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub top_file: FileResult,
    pub docid: String,
    pub language: String,
    pub best_matching_line_number: u32,
    pub num_matches: u32,
    pub num_duplicates: u32,
    pub has_unshown_matches: bool,
    pub hit_max_matches: bool,
    pub children: Vec<String>,

    #[serde(rename = "match")]
    pub matches: Vec<SingleMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub search_result: Vec<SearchResult>,
    pub estimated_total_number_of_results: u64,
    pub hit_max_results: bool,
    pub next_page_token: String,
    pub results_offset: u32,
    pub status: i32,
    pub status_message: String,
}

// ---------------------------------------------------------------------------
// Cross references
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefSearchRequest {
    pub file_spec: FileSpec,
    pub query: String,
    pub max_num_results: u32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edge_filter: Vec<EdgeKind>,
}

impl Default for XrefSearchRequest {
    fn default() -> Self {
        Self {
            file_spec: FileSpec::default(),
            query: String::new(),
            max_num_results: DEFAULT_MAX_RESULTS,
            edge_filter: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefSingleMatch {
    pub signature: String,
    pub line_number: u32,
    pub line_text: String,

    /// Human-readable edge name, e.g. "Definition".
    #[serde(rename = "type")]
    pub kind: String,
    pub type_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefSearchResult {
    pub file: FileSpec,

    #[serde(rename = "match")]
    pub matches: Vec<XrefSingleMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefSearchResponse {
    pub search_result: Vec<XrefSearchResult>,
    pub from_kythe: bool,
    pub kythe_next_page_token: String,
    pub status: i32,
    pub status_message: String,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
    pub announcement: String,
    pub build_label: String,
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Compound envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_request: Option<Vec<AnnotationRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info_request: Option<Vec<FileInfoRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_request: Option<Vec<SearchRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_request: Option<Vec<StatusRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xref_search_request: Option<Vec<XrefSearchRequest>>,
}

impl CompoundRequest {
    pub fn search(request: SearchRequest) -> Self {
        Self {
            search_request: Some(vec![request]),
            ..Self::default()
        }
    }

    pub fn xref_search(request: XrefSearchRequest) -> Self {
        Self {
            xref_search_request: Some(vec![request]),
            ..Self::default()
        }
    }

    pub fn file_info(request: FileInfoRequest) -> Self {
        Self {
            file_info_request: Some(vec![request]),
            ..Self::default()
        }
    }

    pub fn annotation(request: AnnotationRequest) -> Self {
        Self {
            annotation_request: Some(vec![request]),
            ..Self::default()
        }
    }

    pub fn status() -> Self {
        Self {
            status_request: Some(vec![StatusRequest {}]),
            ..Self::default()
        }
    }

    /// Method name used for fingerprinting and logs.
    pub fn method(&self) -> &'static str {
        let present = [
            (self.search_request.is_some(), "search"),
            (self.xref_search_request.is_some(), "xref_search"),
            (self.file_info_request.is_some(), "file_info"),
            (self.annotation_request.is_some(), "annotation"),
            (self.status_request.is_some(), "status"),
        ];
        let mut names = present.iter().filter(|(set, _)| *set).map(|(_, n)| *n);
        match (names.next(), names.next()) {
            (Some(name), None) => name,
            _ => "compound",
        }
    }

    pub fn to_request(&self) -> ClientResult<Request> {
        Request::new(self.method(), self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_response: Option<Vec<AnnotationResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info_response: Option<Vec<FileInfoResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_response: Option<Vec<SearchResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_response: Option<Vec<StatusResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xref_search_response: Option<Vec<XrefSearchResponse>>,

    /// Server-side processing time.
    pub elapsed_ms: u64,
}

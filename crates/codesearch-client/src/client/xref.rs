use std::fmt;
use std::future::Future;
use std::panic::Location;

use crate::callers::Caller;
use crate::error::ClientResult;
use crate::messages::{
    Annotation, AnnotationType, EdgeKind, FileInfo, FileSpec, XrefSearchResult, XrefSingleMatch,
};

use super::CodeSearchClient;

/// A node in the cross-reference graph.
///
/// Nodes are identified by their signature. Those built from search results
/// also carry the file and line they were found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefNode {
    pub file: Option<FileSpec>,
    pub matched: XrefSingleMatch,
}

impl XrefNode {
    /// A starter node with nothing but a signature.
    pub fn from_signature(signature: impl Into<String>, file: Option<FileSpec>) -> Self {
        Self {
            file,
            matched: XrefSingleMatch {
                signature: signature.into(),
                ..XrefSingleMatch::default()
            },
        }
    }

    /// Node for the target of a definition link.
    pub fn from_annotation(annotation: &Annotation) -> Option<Self> {
        if annotation.kind.id != AnnotationType::LINK_TO_DEFINITION {
            return None;
        }
        let link = annotation.internal_link.as_ref()?;
        Some(Self::from_signature(
            link.signature.clone(),
            Some(FileSpec::new(link.path.clone(), link.package_name.clone())),
        ))
    }

    /// One node per match, in result order.
    pub fn from_search_results(results: Vec<XrefSearchResult>) -> Vec<Self> {
        results
            .into_iter()
            .flat_map(|result| {
                let file = result.file;
                result.matches.into_iter().map(move |matched| Self {
                    file: Some(file.clone()),
                    matched,
                })
            })
            .collect()
    }

    pub fn signature(&self) -> &str {
        &self.matched.signature
    }

    /// Outgoing edges matching any kind in `kinds`.
    #[track_caller]
    pub fn edges<'a>(
        &'a self,
        client: &'a CodeSearchClient,
        kinds: &'a [EdgeKind],
        max_results: u32,
    ) -> impl Future<Output = ClientResult<Vec<Self>>> + Send + 'a {
        self.edges_from(client, kinds, max_results, Location::caller())
    }

    async fn edges_from(
        &self,
        client: &CodeSearchClient,
        kinds: &[EdgeKind],
        max_results: u32,
        caller: Caller,
    ) -> ClientResult<Vec<Self>> {
        let results = client
            .xrefs_from(self.signature(), kinds, max_results, caller)
            .await?;
        Ok(Self::from_search_results(results))
    }

    /// Outgoing edges of every known kind.
    #[track_caller]
    pub fn all_edges<'a>(
        &'a self,
        client: &'a CodeSearchClient,
        max_results: u32,
    ) -> impl Future<Output = ClientResult<Vec<Self>>> + Send + 'a {
        self.edges_from(client, EdgeKind::ALL, max_results, Location::caller())
    }

    /// The file this node was found in, if known.
    #[track_caller]
    pub fn file_info<'a>(
        &'a self,
        client: &'a CodeSearchClient,
    ) -> impl Future<Output = ClientResult<Option<FileInfo>>> + Send + 'a {
        self.file_info_from(client, Location::caller())
    }

    async fn file_info_from(
        &self,
        client: &CodeSearchClient,
        caller: Caller,
    ) -> ClientResult<Option<FileInfo>> {
        match &self.file {
            Some(spec) => client.file_info_from(&spec.name, caller).await.map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Display for XrefNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) if self.matched.line_number > 0 => write!(
                f,
                "{}:{}: {}",
                file.name, self.matched.line_number, self.matched.signature
            ),
            _ => write!(f, "{}", self.matched.signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::InternalLink;

    fn xref_match(signature: &str, line: u32) -> XrefSingleMatch {
        XrefSingleMatch {
            signature: signature.to_string(),
            line_number: line,
            ..XrefSingleMatch::default()
        }
    }

    #[test]
    fn test_from_search_results_flattens_matches() {
        let results = vec![
            XrefSearchResult {
                file: FileSpec::new("a.cc", "chromium"),
                matches: vec![xref_match("sig-1", 10), xref_match("sig-2", 20)],
            },
            XrefSearchResult {
                file: FileSpec::new("b.h", "chromium"),
                matches: vec![xref_match("sig-3", 5)],
            },
            XrefSearchResult::default(),
        ];

        let nodes = XrefNode::from_search_results(results);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].signature(), "sig-2");
        assert_eq!(nodes[2].file.as_ref().unwrap().name, "b.h");
        assert_eq!(nodes[0].to_string(), "a.cc:10: sig-1");
    }

    #[test]
    fn test_from_signature_has_only_signature() {
        let node = XrefNode::from_signature("cpp:net::class-Foo", None);
        assert_eq!(node.signature(), "cpp:net::class-Foo");
        assert_eq!(node.matched.line_number, 0);
        assert_eq!(node.to_string(), "cpp:net::class-Foo");
    }

    #[test]
    fn test_from_annotation_requires_definition_link() {
        let link = Annotation {
            kind: AnnotationType::new(AnnotationType::LINK_TO_DEFINITION),
            internal_link: Some(InternalLink {
                package_name: "chromium".to_string(),
                path: "net/http/foo.h".to_string(),
                signature: "sig-foo".to_string(),
                ..InternalLink::default()
            }),
            ..Annotation::default()
        };
        let node = XrefNode::from_annotation(&link).unwrap();
        assert_eq!(node.signature(), "sig-foo");
        assert_eq!(node.file.unwrap().name, "net/http/foo.h");

        let other = Annotation {
            kind: AnnotationType::new(AnnotationType::XREF_SIGNATURE),
            ..link
        };
        assert!(XrefNode::from_annotation(&other).is_none());
    }
}

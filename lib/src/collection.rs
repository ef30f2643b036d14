use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use glob::{MatchOptions, Pattern};

use crate::error::{Fault, Result};
use crate::taxonomy::{DocId, DocumentSet, Membership};
use crate::value::{Dict, Value};

/// Collection name to member documents, in final order.
pub type Collections = BTreeMap<Arc<str>, Vec<DocId>>;

const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A validated collection definition.
#[derive(Debug, Clone)]
pub struct Grouping {
    pub name: Arc<str>,
    pub pattern: Pattern,
    pub sort_by: Option<Arc<str>>,
    pub reverse: bool,
    /// Defaults merged into members that lack the key.
    pub metadata: Dict,
    /// Layout for members without their own.
    pub layout: Option<Arc<str>>,
}

impl Grouping {
    pub fn new(name: &str, pattern: &str) -> Result<Grouping> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            Fault::config(format!("collections.{name}.pattern"), e.to_string())
        })?;

        Ok(Grouping {
            name: name.into(),
            pattern,
            sort_by: None,
            reverse: false,
            metadata: Dict::new(),
            layout: None,
        })
    }

    pub fn sorted_by(mut self, field: &str, reverse: bool) -> Self {
        self.sort_by = Some(field.into());
        self.reverse = reverse;
        self
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn matches(&self, identity: &str) -> bool {
        self.pattern.matches_with(identity, MATCH)
    }
}

/// Compares by sort key; documents without one go last.
pub(crate) fn by_key(a: &Option<Value>, b: &Option<Value>, reverse: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if reverse => b.cmp(a),
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Selects, orders, and annotates the members of each grouping.
///
/// Members are matched against their identity in discovery order, then
/// stably sorted by `sort_by` (descending with `reverse`, ties keep
/// discovery order). Without `sort_by`, `reverse` flips discovery order.
/// Every member records its collection and final index; a document can
/// belong to any number of collections.
pub fn group(set: &mut DocumentSet, groupings: &[Grouping]) -> Collections {
    let mut collections = Collections::new();
    for grouping in groupings {
        let mut members: Vec<(DocId, Option<Value>)> = set.iter()
            .filter(|(_, doc)| grouping.matches(&doc.identity))
            .map(|(id, doc)| {
                let key = grouping.sort_by.as_ref()
                    .and_then(|field| doc.metadata.get_raw(field))
                    .filter(|v| !v.is_empty());

                (id, key)
            })
            .collect();

        match grouping.sort_by {
            Some(_) => members.sort_by(|(_, a), (_, b)| by_key(a, b, grouping.reverse)),
            None if grouping.reverse => members.reverse(),
            None => {}
        }

        let members: Vec<DocId> = members.into_iter().map(|(id, _)| id).collect();
        for (index, &id) in members.iter().enumerate() {
            let document = &mut set[id];
            document.metadata.append_absent(&grouping.metadata);
            if document.layout.is_none() {
                document.layout = Some(grouping.layout.clone().unwrap_or_else(|| grouping.name.clone()));
            }

            match document.collections.iter_mut().find(|m| m.name == grouping.name) {
                Some(membership) => membership.index = index,
                None => document.collections.push(Membership { name: grouping.name.clone(), index }),
            }
        }

        collections.insert(grouping.name.clone(), members);
    }

    collections
}

/// Rewrites every member's collection index to its current position.
pub(crate) fn reindex(set: &mut DocumentSet, collections: &Collections) {
    for (name, members) in collections {
        for (index, &id) in members.iter().enumerate() {
            let membership = set.get_mut(id)
                .and_then(|doc| doc.collections.iter_mut().find(|m| m.name == *name));

            if let Some(membership) = membership {
                membership.index = index;
            }
        }
    }
}

/// Removes `dropped` from every collection and reindexes the rest.
pub(crate) fn forget(set: &mut DocumentSet, collections: &mut Collections, dropped: &[DocId]) {
    for members in collections.values_mut() {
        members.retain(|id| !dropped.contains(id));
    }

    reindex(set, collections);
}

//! Channel routing configuration.
//!
//! A [`ChannelRoute`] is the leaf of the routing engine: it holds one
//! channel's default handler and triggers and turns message text into a
//! handler id. [`ChannelSet`] is the ordered collection the router and the
//! registry both read.

mod route;

pub use route::{
    ChannelHandler, ChannelRoute, RangeTrigger, StringTrigger, TokenRange, extract_token_id,
};

use std::collections::HashMap;

/// Channels in declaration order, indexed by channel id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSet {
    routes: Vec<ChannelRoute>,
    index: HashMap<String, usize>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel; a channel with the same id is replaced in place.
    pub fn insert(&mut self, route: ChannelRoute) {
        if let Some(&position) = self.index.get(&route.id) {
            self.routes[position] = route;
        } else {
            self.index.insert(route.id.clone(), self.routes.len());
            self.routes.push(route);
        }
    }

    /// Get a channel by id
    pub fn get(&self, channel_id: &str) -> Option<&ChannelRoute> {
        self.index.get(channel_id).map(|&i| &self.routes[i])
    }

    /// Channels in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ChannelRoute> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl FromIterator<ChannelRoute> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = ChannelRoute>>(iter: I) -> Self {
        let mut set = Self::new();
        for route in iter {
            set.insert(route);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_set_keeps_declaration_order() {
        let set: ChannelSet = [
            ChannelRoute::passive("b", "second"),
            ChannelRoute::passive("a", "first"),
        ]
        .into_iter()
        .collect();

        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(set.get("a").map(|r| r.name.as_str()), Some("first"));
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn test_channel_set_replaces_same_id() {
        let mut set = ChannelSet::new();
        set.insert(ChannelRoute::passive("a", "old"));
        set.insert(ChannelRoute::passive("a", "new"));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").map(|r| r.name.as_str()), Some("new"));
    }
}

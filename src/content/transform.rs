//! Transformer chain
//!
//! An ordered list of rules applied to every entry of the merged stream.
//! Each rule may replace a matching entry; rules that never matched during
//! a whole run may synthesize one default entry at end of stream. That is
//! how every backend guarantees its generated control file exists exactly
//! once while still letting source content override it.

use futures::future::BoxFuture;

use crate::content::ContentEntry;
use crate::error::TransformError;

type MatchFn = Box<dyn Fn(&ContentEntry) -> bool + Send + Sync>;
type ApplyFn =
    Box<dyn Fn(ContentEntry) -> BoxFuture<'static, Result<ContentEntry, TransformError>> + Send + Sync>;
type CreateFn = Box<dyn Fn() -> ContentEntry + Send + Sync>;

/// One content-rewriting rule
pub struct Transformer {
    /// Rule name, used in diagnostics
    pub name: String,
    matcher: MatchFn,
    apply: ApplyFn,
    create_when_missing: Option<CreateFn>,
}

impl Transformer {
    /// Create a rule from a predicate and an async rewrite
    pub fn new<M, A>(name: impl Into<String>, matcher: M, apply: A) -> Self
    where
        M: Fn(&ContentEntry) -> bool + Send + Sync + 'static,
        A: Fn(ContentEntry) -> BoxFuture<'static, Result<ContentEntry, TransformError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            matcher: Box::new(matcher),
            apply: Box::new(apply),
            create_when_missing: None,
        }
    }

    /// Create a rule matching entries by exact name
    pub fn for_entry_name<A>(target: &'static str, apply: A) -> Self
    where
        A: Fn(ContentEntry) -> BoxFuture<'static, Result<ContentEntry, TransformError>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(target, move |entry| entry.name == target, apply)
    }

    /// Synthesize a default entry at end of stream if this rule never
    /// matched; the synthesized entry runs through the rule's own rewrite
    #[must_use]
    pub fn create_when_missing<C>(mut self, create: C) -> Self
    where
        C: Fn() -> ContentEntry + Send + Sync + 'static,
    {
        self.create_when_missing = Some(Box::new(create));
        self
    }
}

/// The ordered chain, tracking which rules have matched
pub struct TransformChain {
    transformers: Vec<Transformer>,
    used: Vec<bool>,
    only_matching: bool,
}

impl TransformChain {
    /// Build a chain; declaration order is application order
    pub fn new(transformers: Vec<Transformer>) -> Self {
        let used = vec![false; transformers.len()];
        Self {
            transformers,
            used,
            only_matching: false,
        }
    }

    /// Yield only entries matched by at least one rule
    #[must_use]
    pub fn only_matching(mut self, only_matching: bool) -> Self {
        self.only_matching = only_matching;
        self
    }

    /// Run one entry through the chain.
    ///
    /// Every matching rule is applied in declared order, each seeing the
    /// previous rule's output. Returns `None` when `only_matching` is set
    /// and no rule matched.
    pub async fn apply(
        &mut self,
        entry: ContentEntry,
    ) -> Result<Option<ContentEntry>, TransformError> {
        let mut current = entry;
        let mut matched = false;

        for (i, transformer) in self.transformers.iter().enumerate() {
            if (transformer.matcher)(&current) {
                current = (transformer.apply)(current).await?;
                self.used[i] = true;
                matched = true;
            }
        }

        if self.only_matching && !matched {
            return Ok(None);
        }
        Ok(Some(current))
    }

    /// End-of-stream synthesis: every rule that never matched and defines
    /// a default entry produces exactly one, passed through its rewrite
    pub async fn finish(&mut self) -> Result<Vec<ContentEntry>, TransformError> {
        let mut synthesized = Vec::new();
        for (i, transformer) in self.transformers.iter().enumerate() {
            if self.used[i] {
                continue;
            }
            if let Some(create) = &transformer.create_when_missing {
                let entry = (transformer.apply)(create()).await?;
                self.used[i] = true;
                synthesized.push(entry);
            }
        }
        Ok(synthesized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn appending(name: &'static str, target: &'static str, suffix: &'static str) -> Transformer {
        Transformer::new(
            name,
            move |entry: &ContentEntry| entry.name == target,
            move |entry: ContentEntry| {
                async move {
                    let text = entry.text().await.map_err(|e| TransformError::Read {
                        entry: entry.name.clone(),
                        error: e.to_string(),
                    })?;
                    Ok(ContentEntry::from_bytes(
                        entry.name.clone(),
                        format!("{text}{suffix}"),
                    ))
                }
                .boxed()
            },
        )
    }

    #[tokio::test]
    async fn test_transform_order_is_declaration_order() {
        let mut chain = TransformChain::new(vec![
            appending("a", "f", "-a"),
            appending("b", "f", "-b"),
        ]);
        let out = chain
            .apply(ContentEntry::from_bytes("f", "x"))
            .await
            .unwrap()
            .unwrap();
        // B sees A's output: B(A(x)), never the reverse
        assert_eq!(out.text().await.unwrap(), "x-a-b");
    }

    #[tokio::test]
    async fn test_synthesis_when_nothing_matched() {
        let transformer = appending("ctl", "PKGBUILD", "!").create_when_missing(|| {
            ContentEntry::from_bytes("PKGBUILD", "gen")
        });
        let mut chain = TransformChain::new(vec![transformer]);

        let out = chain
            .apply(ContentEntry::from_bytes("other", "x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.name, "other");

        let synthesized = chain.finish().await.unwrap();
        assert_eq!(synthesized.len(), 1);
        assert_eq!(synthesized[0].name, "PKGBUILD");
        // the synthesized entry went through the rule's own rewrite
        assert_eq!(synthesized[0].text().await.unwrap(), "gen!");
    }

    #[tokio::test]
    async fn test_no_synthesis_after_a_match() {
        let transformer = appending("ctl", "PKGBUILD", "!").create_when_missing(|| {
            ContentEntry::from_bytes("PKGBUILD", "gen")
        });
        let mut chain = TransformChain::new(vec![transformer]);

        chain
            .apply(ContentEntry::from_bytes("PKGBUILD", "src"))
            .await
            .unwrap();
        assert!(chain.finish().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finish_is_idempotent() {
        let transformer = appending("ctl", "PKGBUILD", "!")
            .create_when_missing(|| ContentEntry::empty("PKGBUILD"));
        let mut chain = TransformChain::new(vec![transformer]);
        assert_eq!(chain.finish().await.unwrap().len(), 1);
        assert!(chain.finish().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_matching_filters_unmatched() {
        let mut chain =
            TransformChain::new(vec![appending("a", "f", "-a")]).only_matching(true);
        assert!(chain
            .apply(ContentEntry::from_bytes("other", "x"))
            .await
            .unwrap()
            .is_none());
        assert!(chain
            .apply(ContentEntry::from_bytes("f", "x"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unmatched_entries_pass_through_by_default() {
        let mut chain = TransformChain::new(vec![appending("a", "f", "-a")]);
        let out = chain
            .apply(ContentEntry::from_bytes("other", "x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.text().await.unwrap(), "x");
    }
}

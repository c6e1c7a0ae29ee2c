#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::error::Error;
    use crate::hierarchy::ClusterNode;
    use crate::matrix::Renderer;
    use crate::pipeline::{Pipeline, PipelineConfig};
    use crate::store::LoadPolicy;
    use crate::Result;

    /// Fonts rendered to a 1-D "shape" coordinate. `None` marks a null
    /// rendering; "zero" sits at the same coordinate as every other font
    /// because the oracle reports 0 for it.
    struct FakeFonts {
        renders: Cell<usize>,
    }

    impl FakeFonts {
        fn new() -> Self {
            Self {
                renders: Cell::new(0),
            }
        }
    }

    impl Renderer for FakeFonts {
        type Output = Option<(String, f64)>;

        fn render(&self, id: &str) -> Result<Self::Output> {
            self.renders.set(self.renders.get() + 1);
            let x = match id {
                "arial" => 0.0,
                "helvetica" => 1.0,
                "times" => 10.0,
                "georgia" => 12.0,
                "zero" => 0.0,
                "ghost" => 5.0,
                "blank" => return Ok(None),
                other => return Err(Error::oracle(other, "unknown font")),
            };
            Ok(Some((id.to_string(), x)))
        }

        fn is_null(&self, rendered: &Self::Output) -> bool {
            rendered.is_none()
        }
    }

    fn oracle(a: &Option<(String, f64)>, b: &Option<(String, f64)>) -> Result<f64> {
        match (a, b) {
            (Some((na, xa)), Some((nb, xb))) => {
                if na == "zero" || nb == "zero" {
                    Ok(0.0)
                } else {
                    Ok((xa - xb).abs())
                }
            }
            _ => Err(Error::oracle("?", "null rendering reached the oracle")),
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn installed(id: &str) -> bool {
        id != "ghost"
    }

    fn fonts() -> Vec<String> {
        ["arial", "blank", "georgia", "ghost", "helvetica", "times", "zero"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_full_run_without_cache() -> Result<()> {
        init_tracing();
        let pipeline = Pipeline::new(PipelineConfig::new().with_use_cache(false));
        let out = pipeline.run(fonts(), &FakeFonts::new(), &oracle, &installed)?;

        assert_eq!(out.items, vec!["arial", "georgia", "helvetica", "times"]);
        assert_eq!(out.report.zero_rows, vec!["zero"]);
        assert_eq!(out.report.missing, vec!["ghost"]);
        assert!(out.matrix.is_symmetric());
        assert!(out.built_matrix && out.built_tree);

        // (arial, helvetica) at 1, then (georgia, times) at 2.
        let names = |i: usize| out.items[i].clone();
        let (left, right) = out.tree.children().unwrap();
        assert_eq!(left.leaves().into_iter().map(names).collect::<Vec<_>>(), ["arial", "helvetica"]);
        assert_eq!(right.leaves().into_iter().map(names).collect::<Vec<_>>(), ["georgia", "times"]);
        Ok(())
    }

    #[test]
    fn test_second_run_loads_both_blobs() -> Result<()> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::new().with_cache_dir(dir.path());

        let first = Pipeline::new(config.clone()).run(fonts(), &FakeFonts::new(), &oracle, &installed)?;
        assert!(first.built_matrix && first.built_tree);

        let renderer = FakeFonts::new();
        let second = Pipeline::new(config).run(fonts(), &renderer, &oracle, &installed)?;
        assert!(!second.built_matrix);
        assert!(!second.built_tree);
        assert_eq!(renderer.renders.get(), 0);
        assert_eq!(second.items, first.items);
        assert_eq!(second.tree, first.tree);
        Ok(())
    }

    #[test]
    fn test_corrupt_cache_falls_back_to_rebuild() -> Result<()> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::new().with_cache_dir(dir.path());
        std::fs::write(dir.path().join("matrix.json"), "{ truncated")?;
        std::fs::write(dir.path().join("tree.json"), "[]")?;

        let out = Pipeline::new(config).run(fonts(), &FakeFonts::new(), &oracle, &installed)?;
        assert!(out.built_matrix && out.built_tree);
        assert_eq!(out.tree.leaf_count(), 4);
        Ok(())
    }

    #[test]
    fn test_strict_policy_propagates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new()
            .with_cache_dir(dir.path())
            .with_load_policy(LoadPolicy::Strict);
        std::fs::write(dir.path().join("matrix.json"), "{ truncated").unwrap();

        let err = Pipeline::new(config)
            .run(fonts(), &FakeFonts::new(), &oracle, &installed)
            .unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_stale_tree_is_rebuilt() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::new().with_cache_dir(dir.path());
        let pipeline = Pipeline::new(config);
        pipeline.run(fonts(), &FakeFonts::new(), &oracle, &installed)?;

        // Overwrite the tree with one over the wrong number of leaves.
        let stale = ClusterNode::branch(ClusterNode::leaf(0), ClusterNode::leaf(1), 1.0);
        std::fs::write(dir.path().join("tree.json"), serde_json::to_vec(&stale)?)?;

        let out = pipeline.run(fonts(), &FakeFonts::new(), &oracle, &installed)?;
        assert!(!out.built_matrix);
        assert!(out.built_tree);
        assert!(out.tree.covers(4));
        Ok(())
    }

    #[test]
    fn test_render_failure_aborts_run() {
        let mut items = fonts();
        items.push("comic-sans".into());
        let pipeline = Pipeline::new(PipelineConfig::new().with_use_cache(false));
        let err = pipeline
            .run(items, &FakeFonts::new(), &oracle, &installed)
            .unwrap_err();
        assert!(matches!(err, Error::Oracle { ref item, .. } if item == "comic-sans"));
    }

    #[test]
    fn test_markup_for_report() -> Result<()> {
        let out = Pipeline::new(PipelineConfig::new().with_use_cache(false))
            .run(fonts(), &FakeFonts::new(), &oracle, &installed)?;
        let html = out
            .tree
            .traverse_markup(|i| format!("<a href='{0}/index.html'>{0}</a>", out.items[i]))
            .to_html();
        assert!(html.starts_with("<ul><li><ul><li><a href='arial/index.html'>arial</a></li>"));
        assert_eq!(html.matches("<ul>").count(), 3);
        Ok(())
    }

    #[test]
    fn test_config_from_json() -> Result<()> {
        let config = PipelineConfig::from_json(
            r#"{"cache_dir":"/tmp/fc","eviction":"LeastRecentlyUsed","budget":{"limit":10,"charset_len":1,"unit_image_size":1}}"#,
        )?;
        assert_eq!(config.cache_dir, std::path::PathBuf::from("/tmp/fc"));
        assert_eq!(config.budget.limit, 10);
        assert_eq!(config.tree_file, "tree.json");
        assert!(config.use_cache);
        Ok(())
    }
}

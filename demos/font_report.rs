use fontclust::{Clusterer, Pipeline, PipelineConfig, Renderer, Result};

/// Stand-in for a glyph rasterizer: each face "renders" to a tiny feature
/// vector (stroke weight, contrast, serif length).
struct FeatureRenderer;

impl Renderer for FeatureRenderer {
    type Output = [f64; 3];

    fn render(&self, id: &str) -> Result<Self::Output> {
        let features = match id {
            "arial" => [0.40, 0.10, 0.00],
            "helvetica" => [0.42, 0.10, 0.00],
            "verdana" => [0.45, 0.12, 0.00],
            "times" => [0.35, 0.60, 0.30],
            "georgia" => [0.38, 0.55, 0.32],
            "garamond" => [0.30, 0.65, 0.28],
            "courier" => [0.30, 0.05, 0.40],
            _ => [0.0; 3],
        };
        Ok(features)
    }
}

fn euclidean(a: &[f64; 3], b: &[f64; 3]) -> Result<f64> {
    Ok(a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=fontclust=info shows matrix progress and sanitizer removals.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let fonts: Vec<String> = [
        "arial", "courier", "garamond", "georgia", "helvetica", "times", "verdana",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let cache = std::env::temp_dir().join("fontclust-demo");
    let config = PipelineConfig::new().with_cache_dir(&cache);
    let out = Pipeline::new(config).run(fonts, &FeatureRenderer, &euclidean, &|_: &str| true)?;

    println!(
        "{} fonts (matrix {}, tree {})",
        out.items.len(),
        if out.built_matrix { "built" } else { "cached" },
        if out.built_tree { "built" } else { "cached" },
    );
    print!("{}", out.tree.traverse_text(|i| out.items[i].clone()));

    let html = out
        .tree
        .traverse_markup(|i| format!("<a href='{0}/index.html'>{0}</a>", out.items[i]))
        .to_html();
    println!("{html}");

    // Flat groups from the merge log.
    let clustering = Clusterer::new().cluster_with_dendrogram(&out.items, &out.matrix)?;
    let labels = clustering.dendrogram.cut_to_k(3)?;
    for (font, label) in out.items.iter().zip(&labels) {
        println!("  {label}: {font}");
    }

    Ok(())
}

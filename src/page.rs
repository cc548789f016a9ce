use crate::api::ChartRequest;

const PAGE_TEMPLATE: &str = include_str!("../templates/index.html");

// Window choices offered by the form checkboxes.
const SMA_CHOICES: [usize; 5] = [10, 20, 50, 100, 200];
const EMA_CHOICES: [usize; 4] = [10, 20, 50, 100];

/// Merges the rendered chart (if any), the echoed request parameters, and the
/// analyzer's observations into the response page. A failed pipeline passes
/// `None` and an empty list; the form still comes back populated.
pub fn render_page(request: &ChartRequest, image: Option<&str>, analysis: &[String]) -> String {
    let chart_section = match image {
        Some(encoded) => format!(
            "  <section class=\"chart\">\n    <img src=\"data:image/png;base64,{}\" alt=\"{} price chart\">\n  </section>",
            encoded,
            escape_html(&request.ticker)
        ),
        None => String::new(),
    };

    let analysis_section = if analysis.is_empty() {
        String::new()
    } else {
        let items: String = analysis
            .iter()
            .map(|observation| format!("      <li>{}</li>\n", escape_html(observation)))
            .collect();
        format!("  <section class=\"analysis\">\n    <h2>Indicator commentary</h2>\n    <ul>\n{}    </ul>\n  </section>", items)
    };

    PAGE_TEMPLATE
        .replace("{{TICKER}}", &escape_html(&request.ticker))
        .replace("{{SMA_OPTIONS}}", &checkbox_row("sma_periods", &SMA_CHOICES, &request.sma_periods))
        .replace("{{EMA_OPTIONS}}", &checkbox_row("ema_periods", &EMA_CHOICES, &request.ema_periods))
        .replace("{{BOLLINGER_CHECKED}}", if request.bollinger { "checked" } else { "" })
        .replace("{{CHART_SECTION}}", &chart_section)
        .replace("{{ANALYSIS_SECTION}}", &analysis_section)
}

fn checkbox_row(name: &str, choices: &[usize], selected: &[usize]) -> String {
    choices
        .iter()
        .map(|&period| {
            let checked = if selected.contains(&period) { " checked" } else { "" };
            format!(
                "<label><input type=\"checkbox\" name=\"{}\" value=\"{}\"{}> {}</label>",
                name, period, checked, period
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ")
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

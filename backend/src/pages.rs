use shared::ScanReport;

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;background:#f4f6f8;margin:0;padding:2rem;color:#222}\
main{max-width:720px;margin:0 auto;background:#fff;border-radius:8px;padding:2rem;\
box-shadow:0 2px 8px rgba(0,0,0,.08)}\
h1{margin-top:0}\
form{margin:1.5rem 0}\
button{background:#2b6cb0;color:#fff;border:0;border-radius:4px;padding:.6rem 1.2rem;\
cursor:pointer}\
img.scan{max-width:100%;border-radius:4px;margin:.5rem 0}\
.confidence{color:#2b6cb0;font-weight:600}\
.explanation{background:#f8fafc;border-left:3px solid #2b6cb0;padding:1rem;margin:1rem 0}\
.disclaimer{color:#777;font-size:.85rem}\
.hint{color:#777;font-size:.9rem}";

pub fn index_page() -> String {
    page(
        "Brain Scan Triage",
        "<h1>Brain Scan Triage</h1>\
         <p>Upload a brain scan to run it through the detection model.</p>\
         <form action=\"/predict\" method=\"post\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"image\" accept=\".png,.jpg,.jpeg,.gif\" required>\
         <button type=\"submit\">Analyze scan</button>\
         </form>\
         <p class=\"hint\">Accepted formats: PNG, JPG, JPEG, GIF.</p>",
    )
}

pub fn report_page(report: &ScanReport) -> String {
    let heading = match &report.prediction {
        Some(prediction) => format!(
            "<h2>{}</h2><p class=\"confidence\">Confidence: {}</p>",
            escape_html(&prediction.label),
            percent(prediction.confidence)
        ),
        None => "<h2>No abnormality detected</h2>".to_string(),
    };

    let result_image = match &report.result_url {
        Some(url) => format!(
            "<h3>Annotated result</h3><img class=\"scan\" src=\"{}\" alt=\"Annotated scan\">",
            escape_html(url)
        ),
        None => String::new(),
    };

    let body = format!(
        "<h1>Scan result</h1>{heading}\
         <h3>Uploaded scan</h3><img class=\"scan\" src=\"{scan}\" alt=\"Uploaded scan\">\
         {result_image}\
         <section class=\"explanation\"><h3>About this finding</h3>{explanation}</section>\
         <p class=\"disclaimer\">This tool provides informational output only and is not \
a medical diagnosis.</p>\
         <p><a href=\"/\">Analyze another scan</a></p>",
        heading = heading,
        scan = escape_html(&report.scan_url),
        result_image = result_image,
        explanation = paragraphs(&report.explanation),
    );

    page("Scan result", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title><style>{}</style></head>\
         <body><main>{}</main></body></html>",
        escape_html(title),
        STYLE,
        body
    )
}

pub fn percent(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes remote prose and turns blank lines into paragraph breaks. The
/// explanation service may answer in markdown; this renders it as safe
/// plain text.
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| format!("<p>{}</p>", escape_html(block.trim()).replace('\n', "<br>")))
        .collect()
}

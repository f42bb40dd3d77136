//! Swagger UI HTML generation

const SWAGGER_UI_CDN: &str = "https://unpkg.com/swagger-ui-dist@5";

/// Generate the Swagger UI page for a JSON document URL.
///
/// Assets are loaded from the swagger-ui-dist CDN.
pub fn generate_swagger_html(openapi_url: &str, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="{cdn}/swagger-ui.css">
    <style>
        body {{
            margin: 0;
            padding: 0;
        }}
        .swagger-ui .topbar {{
            display: none;
        }}
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="{cdn}/swagger-ui-bundle.js"></script>
    <script src="{cdn}/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {{
            SwaggerUIBundle({{
                url: "{url}",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            }});
        }};
    </script>
</body>
</html>"#,
        title = escape_html(title),
        cdn = SWAGGER_UI_CDN,
        url = openapi_url.replace('"', "%22"),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_points_at_document() {
        let html = generate_swagger_html("/docs/openapi.json", "Users <API>");
        assert!(html.contains(r#"url: "/docs/openapi.json""#));
        assert!(html.contains("<title>Users &lt;API&gt;</title>"));
        assert!(html.contains("swagger-ui-bundle.js"));
    }
}

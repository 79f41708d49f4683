use crate::server::api::{self, ApiContext, SimulatePayloadError};

pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn json(body: String) -> Self {
        Self {
            status_code: 200,
            status_text: "OK",
            content_type: "application/json",
            body,
        }
    }
}

/// Dispatches one request. Query strings are ignored.
pub fn route_request(method: &str, path: &str, body: &str, context: &ApiContext) -> HttpResponse {
    let path = path.split('?').next().unwrap_or(path);
    match (method, path) {
        ("GET", "/") => HttpResponse {
            status_code: 200,
            status_text: "OK",
            content_type: "text/html; charset=utf-8",
            body: index_html(),
        },
        ("GET", "/api/health") => json_or_500(api::health_payload()),
        ("GET", "/api/chests/defaults") => json_or_500(api::chest_defaults_payload()),
        ("GET", "/api/upgrade/defaults") => json_or_500(api::upgrade_defaults_payload()),
        ("POST", "/api/chests/simulate") => {
            simulate_response(api::chest_simulate_payload(body, context))
        }
        ("POST", "/api/upgrade/simulate") => {
            simulate_response(api::upgrade_simulate_payload(body, context))
        }
        (_, "/" | "/api/health" | "/api/chests/defaults" | "/api/upgrade/defaults"
            | "/api/chests/simulate" | "/api/upgrade/simulate") => {
            error_response(405, "Method Not Allowed", "Method not allowed")
        }
        _ => error_response(404, "Not Found", "Route not found"),
    }
}

fn json_or_500(payload: Result<String, serde_json::Error>) -> HttpResponse {
    match payload {
        Ok(body) => HttpResponse::json(body),
        Err(err) => error_response(500, "Internal Server Error", &err.to_string()),
    }
}

fn simulate_response(payload: Result<String, SimulatePayloadError>) -> HttpResponse {
    match payload {
        Ok(body) => HttpResponse::json(body),
        Err(SimulatePayloadError::Parse(err)) => {
            error_response(400, "Bad Request", &format!("Invalid request body: {err}"))
        }
        Err(SimulatePayloadError::Validation(validation)) => {
            validation_error_response(400, "Bad Request", validation)
        }
        Err(SimulatePayloadError::Internal(message)) => {
            error_response(500, "Internal Server Error", &message)
        }
    }
}

fn validation_error_response(
    status_code: u16,
    status_text: &'static str,
    payload: api::ValidationErrorResponse,
) -> HttpResponse {
    let fallback =
        "{\n  \"status\": \"error\",\n  \"message\": \"Validation failed\"\n}".to_string();

    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: serde_json::to_string_pretty(&payload).unwrap_or(fallback),
    }
}

fn error_response(status_code: u16, status_text: &'static str, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}

fn index_html() -> String {
    r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>Reliquary Console</title>
  <style>
    body { font-family: Arial, sans-serif; max-width: 900px; margin: 24px auto; padding: 0 12px; }
    h1 { margin-bottom: 8px; }
    .card { border: 1px solid #ddd; border-radius: 8px; padding: 14px; margin: 14px 0; }
    label { display:block; margin: 8px 0 4px; font-weight: 600; }
    textarea { width: 100%; min-height: 140px; box-sizing: border-box; font-family: monospace; }
    button { margin-top: 12px; padding: 8px 14px; }
    pre { background: #111; color: #aef2ae; padding: 12px; overflow: auto; border-radius: 6px; min-height: 180px; }
  </style>
</head>
<body>
  <h1>Reliquary</h1>
  <p>Monte Carlo runs for reward chests and sequential upgrades.</p>

  <div class="card">
    <strong>Chests</strong>
    <label for="chests">Scenario (JSON)</label>
    <textarea id="chests"></textarea>
    <div><button id="chests-btn">POST /api/chests/simulate</button></div>
  </div>

  <div class="card">
    <strong>Upgrade</strong>
    <label for="upgrade">Scenario (JSON)</label>
    <textarea id="upgrade"></textarea>
    <div><button id="upgrade-btn">POST /api/upgrade/simulate</button></div>
  </div>

  <pre id="output">Ready.</pre>

  <script>
    const output = document.getElementById('output');

    async function load(kind) {
      const response = await fetch('/api/' + kind + '/defaults');
      document.getElementById(kind).value = await response.text();
    }

    async function simulate(kind) {
      output.textContent = 'Running…';
      const response = await fetch('/api/' + kind + '/simulate', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: document.getElementById(kind).value,
      });
      const text = await response.text();
      if (!response.ok) { output.textContent = 'HTTP ' + response.status + '\n' + text; return; }
      const run = JSON.parse(text);
      const report = run.report;
      const summary = kind === 'chests'
        ? { seed: report.seed, percentiles: report.percentile_snapshots.map(s => [s.percentile, s.threshold_value]), or_better: report.or_better_cost_table.theoretical }
        : { seed: report.seed, p: report.theoretical_success_probability, expected_attempts: report.expected_attempts, confidence_attempts: report.confidence_attempts, summary: report.summary };
      output.textContent = 'run ' + run.run_id + '\n' + JSON.stringify(summary, null, 2);
    }

    document.getElementById('chests-btn').addEventListener('click', () => simulate('chests'));
    document.getElementById('upgrade-btn').addEventListener('click', () => simulate('upgrade'));
    load('chests');
    load('upgrade');
  </script>
</body>
</html>
"#
    .to_string()
}

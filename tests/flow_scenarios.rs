//! End-to-end wizard scenarios driven through the HTTP router.
//!
//! Each test builds a router over a fresh in-memory session registry and
//! walks it the way a browser would: the session cookie from the first
//! response and the CSRF token from the latest step view are sent back on
//! every request.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use benefits_flow::config::Config;
use benefits_flow::rest::{build_router, ApiState, Clock};

// ─── Test Client ──────────────────────────────────────────────────────────────

struct WizardClient {
    router: Router,
    cookie: Option<String>,
    csrf: Option<String>,
}

impl WizardClient {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let state = ApiState::new(config)
            .expect("Failed to build API state")
            .with_clock(Clock::Fixed(today));
        Self {
            router: build_router(state),
            cookie: None,
            csrf: None,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// GET a step view and remember its CSRF token
    async fn view(&mut self, uri: &str) -> Value {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
        let view = json(response).await;
        self.csrf = view["csrf_token"].as_str().map(str::to_string);
        view
    }

    async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response {
        let mut pairs: Vec<(&str, &str)> = fields.to_vec();
        let csrf = self.csrf.clone();
        if let Some(token) = csrf.as_deref() {
            pairs.push(("_csrf", token));
        }
        self.post_raw(uri, &pairs).await
    }

    async fn post_raw(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(encode_form(fields))).unwrap())
            .await
    }

    /// GET a step, then POST the form back; returns the redirect location
    async fn submit(&mut self, uri: &str, fields: &[(&str, &str)]) -> String {
        self.view(uri).await;
        let response = self.post(uri, fields).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "POST {}", uri);
        location(&response)
    }

    /// Start a flow and return the URL prefix `/{lang}/{kind}/{id}`
    async fn start(&mut self, lang: &str, kind: &str) -> String {
        let response = self.get(&format!("/{}/{}/start", lang, kind)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        location(&response)
            .strip_suffix("/terms-and-conditions")
            .expect("start should open the terms step")
            .to_string()
    }
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

fn location(response: &Response) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

async fn json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Accept terms and choose the applicant type
async fn through_preamble(client: &mut WizardClient, prefix: &str, applicant: &str) {
    let next = client
        .submit(
            &format!("{}/terms-and-conditions", prefix),
            &[
                ("acknowledgeTerms", "yes"),
                ("acknowledgePrivacy", "yes"),
                ("shareData", "yes"),
            ],
        )
        .await;
    assert_eq!(next, format!("{}/type-application", prefix));

    let next = client
        .submit(
            &format!("{}/type-application", prefix),
            &[("typeOfApplication", applicant)],
        )
        .await;
    assert_eq!(next, format!("{}/{}/applicant-information", prefix, applicant));
}

/// Accept terms and choose the child-only application
async fn through_children_index(client: &mut WizardClient, prefix: &str) {
    client
        .submit(
            &format!("{}/terms-and-conditions", prefix),
            &[
                ("acknowledgeTerms", "yes"),
                ("acknowledgePrivacy", "yes"),
                ("shareData", "yes"),
            ],
        )
        .await;
    let next = client
        .submit(
            &format!("{}/type-application", prefix),
            &[("typeOfApplication", "child")],
        )
        .await;
    assert_eq!(next, format!("{}/child/children", prefix));
    client.view(&next).await;
}

const APPLICANT: &[(&str, &str)] = &[
    ("firstName", "Jane"),
    ("lastName", "Doe"),
    ("dateOfBirthYear", "1980"),
    ("dateOfBirthMonth", "5"),
    ("dateOfBirthDay", "1"),
    ("socialInsuranceNumber", "046 454 286"),
];

const MAILING_ADDRESS: &[(&str, &str)] = &[
    ("address", "123 Main St"),
    ("city", "Ottawa"),
    ("provinceId", "ON"),
    ("postalCode", "k1a0b1"),
    ("countryId", "CAN"),
];

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_adult_apply_flow_end_to_end() {
    let mut client = WizardClient::new();
    let prefix = client.start("en", "apply").await;
    through_preamble(&mut client, &prefix, "adult").await;
    let step = |slug: &str| format!("{}/adult/{}", prefix, slug);

    // Review is locked until every prerequisite is answered
    let response = client.get(&step("review-information")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), step("applicant-information"));

    let next = client.submit(&step("applicant-information"), APPLICANT).await;
    assert_eq!(next, step("marital-status"));

    // Single applicants skip the partner step
    let next = client
        .submit(&step("marital-status"), &[("maritalStatus", "single")])
        .await;
    assert_eq!(next, step("contact-information"));

    let next = client
        .submit(
            &step("contact-information"),
            &[
                ("phoneNumber", "613-555-0100"),
                ("email", "jane@example.ca"),
                ("confirmEmail", "JANE@example.ca"),
            ],
        )
        .await;
    assert_eq!(next, step("mailing-address"));

    let next = client.submit(&step("mailing-address"), MAILING_ADDRESS).await;
    assert_eq!(next, step("home-address"));

    let next = client
        .submit(&step("home-address"), &[("sameAsMailing", "yes")])
        .await;
    assert_eq!(next, step("communication-preferences"));

    let next = client
        .submit(
            &step("communication-preferences"),
            &[("preferredLanguage", "fr"), ("preferredMethod", "email")],
        )
        .await;
    assert_eq!(next, step("dental-insurance"));

    let next = client
        .submit(&step("dental-insurance"), &[("dentalInsurance", "no")])
        .await;
    assert_eq!(next, step("dental-benefits"));

    let next = client
        .submit(
            &step("dental-benefits"),
            &[
                ("hasFederalBenefits", "no"),
                ("hasProvincialTerritorialBenefits", "yes"),
                ("province", "ON"),
                ("provincialTerritorialSocialProgram", "ON-ODSP"),
            ],
        )
        .await;
    assert_eq!(next, step("review-information"));

    // Visiting review turns on edit mode; a later edit comes straight back
    let review = client.view(&step("review-information")).await;
    assert_eq!(review["edit_mode"], true);
    assert_eq!(review["state"]["mailingAddress"]["postalCode"], "K1A 0B1");
    assert_eq!(
        review["state"]["homeAddress"],
        review["state"]["mailingAddress"]
    );

    let next = client
        .submit(&step("dental-insurance"), &[("dentalInsurance", "yes")])
        .await;
    assert_eq!(next, step("review-information"));

    client.view(&step("review-information")).await;
    let response = client.post(&step("review-information"), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), step("confirmation"));

    let confirmation = client.view(&step("confirmation")).await;
    let code = confirmation["state"]["submissionInfo"]["confirmationCode"]
        .as_str()
        .unwrap();
    assert_eq!(code.len(), 12);

    // A sealed flow only shows its confirmation
    let response = client.get(&step("marital-status")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), step("confirmation"));

    // Leaving the confirmation clears the flow
    let response = client.post(&step("confirmation"), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        Config::default().fallback_url(benefits_flow::locale::Locale::En)
    );

    let response = client.get(&step("confirmation")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://"));
}

#[tokio::test]
async fn test_renew_requires_client_number() {
    let mut client = WizardClient::new();
    let prefix = client.start("fr", "renew").await;
    assert!(prefix.starts_with("/fr/renew/"));
    through_preamble(&mut client, &prefix, "adult").await;

    let uri = format!("{}/adult/applicant-information", prefix);
    client.view(&uri).await;
    let response = client.post(&uri, APPLICANT).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["fields"]["clientNumber"].is_array());

    let mut fields = APPLICANT.to_vec();
    fields.push(("clientNumber", "12345678901"));
    let response = client.post(&uri, &fields).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("{}/adult/marital-status", prefix)
    );
}

#[tokio::test]
async fn test_partnered_applicant_is_sent_to_partner_step() {
    let mut client = WizardClient::new();
    let prefix = client.start("en", "apply").await;
    through_preamble(&mut client, &prefix, "adult").await;
    let step = |slug: &str| format!("{}/adult/{}", prefix, slug);

    client.submit(&step("applicant-information"), APPLICANT).await;
    let next = client
        .submit(&step("marital-status"), &[("maritalStatus", "married")])
        .await;
    assert_eq!(next, step("partner-information"));

    // The partner cannot reuse the applicant's SIN
    client.view(&step("partner-information")).await;
    let response = client
        .post(
            &step("partner-information"),
            &[
                ("firstName", "John"),
                ("lastName", "Doe"),
                ("dateOfBirthYear", "1979"),
                ("dateOfBirthMonth", "2"),
                ("dateOfBirthDay", "14"),
                ("socialInsuranceNumber", "046454286"),
                ("consent", "yes"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert!(body["fields"]["socialInsuranceNumber"].is_array());
}

#[tokio::test]
async fn test_child_flow_adds_and_completes_a_child() {
    let mut client = WizardClient::new();
    let prefix = client.start("en", "apply").await;

    client
        .submit(
            &format!("{}/terms-and-conditions", prefix),
            &[
                ("acknowledgeTerms", "yes"),
                ("acknowledgePrivacy", "yes"),
                ("shareData", "yes"),
            ],
        )
        .await;
    let next = client
        .submit(
            &format!("{}/type-application", prefix),
            &[("typeOfApplication", "child")],
        )
        .await;
    let children = format!("{}/child/children", prefix);
    assert_eq!(next, children);

    // Leaving the index without a child is refused
    client.view(&children).await;
    let response = client.post(&children, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(&format!("{}/child/children/add", prefix), &[])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let information = location(&response);
    assert!(information.starts_with(&format!("{}/child/children/", prefix)));
    assert!(information.ends_with("/information"));

    let view = client.view(&information).await;
    assert_eq!(view["child"]["child_number"], 1);
    assert_eq!(view["child"]["is_new"], true);

    let next = client
        .submit(
            &information,
            &[
                ("firstName", "Sam"),
                ("lastName", "Doe"),
                ("dateOfBirthYear", "2018"),
                ("dateOfBirthMonth", "3"),
                ("dateOfBirthDay", "9"),
                ("isParent", "yes"),
                ("hasSocialInsuranceNumber", "no"),
            ],
        )
        .await;
    let insurance = information.replace("/information", "/dental-insurance");
    assert_eq!(next, insurance);

    let next = client
        .submit(&insurance, &[("dentalInsurance", "no")])
        .await;
    let benefits = information.replace("/information", "/dental-benefits");
    assert_eq!(next, benefits);

    let next = client
        .submit(
            &benefits,
            &[
                ("hasFederalBenefits", "no"),
                ("hasProvincialTerritorialBenefits", "no"),
            ],
        )
        .await;
    assert_eq!(next, children);

    let next = client.submit(&children, &[]).await;
    assert_eq!(next, format!("{}/child/applicant-information", prefix));
}

#[tokio::test]
async fn test_child_dental_steps_wait_for_information() {
    let mut client = WizardClient::new();
    let prefix = client.start("en", "apply").await;
    through_children_index(&mut client, &prefix).await;

    let response = client
        .post(&format!("{}/child/children/add", prefix), &[])
        .await;
    let information = location(&response);
    client.view(&information).await;

    for step in ["/dental-insurance", "/dental-benefits"] {
        let uri = information.replace("/information", step);
        let response = client.get(&uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "GET {}", uri);
        assert_eq!(location(&response), information);

        let response = client.post(&uri, &[("dentalInsurance", "no")]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "POST {}", uri);
        assert_eq!(location(&response), information);
    }
}

#[tokio::test]
async fn test_form_post_without_csrf_token_is_forbidden() {
    let mut client = WizardClient::new();
    let prefix = client.start("en", "apply").await;
    let uri = format!("{}/terms-and-conditions", prefix);
    client.view(&uri).await;

    let response = client
        .post_raw(
            &uri,
            &[
                ("acknowledgeTerms", "yes"),
                ("acknowledgePrivacy", "yes"),
                ("shareData", "yes"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post_raw(&uri, &[("acknowledgeTerms", "yes"), ("_csrf", "forged")])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json(response).await["error"], "forbidden");
}

#[tokio::test]
async fn test_unknown_flow_id_leaves_the_wizard() {
    let mut client = WizardClient::new();
    client.start("fr", "apply").await;

    let response = client
        .get("/fr/apply/not-a-uuid/terms-and-conditions")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        Config::default().fallback_url(benefits_flow::locale::Locale::Fr)
    );

    let response = client
        .get("/fr/apply/2f6b4c1e-8a53-4c1e-9d6a-3b1f2e0c7a99/terms-and-conditions")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).contains("/fr/"));
}

#[tokio::test]
async fn test_flows_are_isolated_between_sessions() {
    let mut first = WizardClient::new();
    let prefix = first.start("en", "apply").await;

    // Same router, no cookie: a fresh session cannot see the first flow
    let mut second = WizardClient {
        router: first.router.clone(),
        cookie: None,
        csrf: None,
    };
    let response = second.get(&format!("{}/terms-and-conditions", prefix)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://"));

    first.view(&format!("{}/terms-and-conditions", prefix)).await;
}

#[tokio::test]
async fn test_disabled_flow_kind_is_not_found() {
    let mut config = Config::default();
    config.flows.enabled = vec!["apply".to_string()];
    let mut client = WizardClient::with_config(config);

    let response = client.get("/en/renew/start").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get("/en/apply/start").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

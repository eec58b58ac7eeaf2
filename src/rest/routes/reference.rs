//! Reference lists for the select fields of the wizard.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::rest::dto::{LocaleQuery, OptionResponse};
use crate::rest::state::ApiState;

/// List countries
#[utoipa::path(
    get,
    path = "/api/v1/reference/countries",
    tag = "Reference",
    params(LocaleQuery),
    responses(
        (status = 200, description = "Countries", body = Vec<OptionResponse>)
    )
)]
pub async fn countries(
    State(state): State<ApiState>,
    Query(query): Query<LocaleQuery>,
) -> Json<Vec<OptionResponse>> {
    let locale = query.locale();
    Json(
        state
            .reference
            .countries()
            .iter()
            .map(|country| OptionResponse::country(country, locale))
            .collect(),
    )
}

/// List the provinces, territories or states of a country
#[utoipa::path(
    get,
    path = "/api/v1/reference/countries/{country}/provinces",
    tag = "Reference",
    params(
        ("country" = String, Path, description = "Country id, e.g. `CAN`"),
        LocaleQuery
    ),
    responses(
        (status = 200, description = "Provinces of the country", body = Vec<OptionResponse>)
    )
)]
pub async fn provinces(
    State(state): State<ApiState>,
    Path(country): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Json<Vec<OptionResponse>> {
    let locale = query.locale();
    Json(
        state
            .reference
            .provinces_of(&country)
            .iter()
            .map(|province| OptionResponse::province(province, locale))
            .collect(),
    )
}

/// List federal dental social programs
#[utoipa::path(
    get,
    path = "/api/v1/reference/programs/federal",
    tag = "Reference",
    params(LocaleQuery),
    responses(
        (status = 200, description = "Federal programs", body = Vec<OptionResponse>)
    )
)]
pub async fn federal_programs(
    State(state): State<ApiState>,
    Query(query): Query<LocaleQuery>,
) -> Json<Vec<OptionResponse>> {
    let locale = query.locale();
    Json(
        state
            .reference
            .federal_programs()
            .iter()
            .map(|program| OptionResponse::program(program, locale))
            .collect(),
    )
}

/// List the dental social programs of a province or territory
#[utoipa::path(
    get,
    path = "/api/v1/reference/programs/provincial/{province}",
    tag = "Reference",
    params(
        ("province" = String, Path, description = "Province id, e.g. `ON`"),
        LocaleQuery
    ),
    responses(
        (status = 200, description = "Provincial programs", body = Vec<OptionResponse>)
    )
)]
pub async fn provincial_programs(
    State(state): State<ApiState>,
    Path(province): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Json<Vec<OptionResponse>> {
    let locale = query.locale();
    Json(
        state
            .reference
            .provincial_programs(&province)
            .iter()
            .map(|program| OptionResponse::program(program, locale))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> ApiState {
        ApiState::new(Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_countries_are_localized() {
        let Json(en) = countries(State(state()), Query(LocaleQuery { lang: None })).await;
        let Json(fr) = countries(
            State(state()),
            Query(LocaleQuery {
                lang: Some("fr".to_string()),
            }),
        )
        .await;

        let canada_en = en.iter().find(|c| c.id == "CAN").unwrap();
        let canada_fr = fr.iter().find(|c| c.id == "CAN").unwrap();
        assert_eq!(canada_en.name, "Canada");
        assert_eq!(canada_fr.name, "Canada");
        assert_eq!(en.len(), fr.len());
    }

    #[tokio::test]
    async fn test_provinces_of_canada() {
        let Json(list) = provinces(
            State(state()),
            Path("CAN".to_string()),
            Query(LocaleQuery { lang: None }),
        )
        .await;
        assert_eq!(list.len(), 13);
        assert!(list.iter().any(|p| p.id == "ON"));
    }

    #[tokio::test]
    async fn test_provincial_programs_scoped() {
        let Json(list) = provincial_programs(
            State(state()),
            Path("ON".to_string()),
            Query(LocaleQuery { lang: None }),
        )
        .await;
        assert!(!list.is_empty());
        assert!(list.iter().all(|p| p.id.starts_with("ON-")));
    }
}

use std::collections::HashSet;

use shared::services::database::{Database, QueryArg, QueryExecutor, QueryJob};
use shared::utilities::{config::Config, errors::AppError};
use tracing::debug;

use crate::features::models::{AllUrl, Component};

const DEFAULT_PURL_TYPE: &str = "github";
const DEFAULT_MAX_COMPONENT_LIMIT: i32 = 50;
const DEFAULT_MAX_VERSION_LIMIT: i32 = 50;

/// Builds and runs the search query family against `projects`, then merges
/// the per-query results into one ranked list.
pub struct ComponentRepository {
    executor: QueryExecutor,
    like_operator: String,
    best_effort: bool,
}

impl ComponentRepository {
    pub fn new(database: &Database, config: &Config) -> Self {
        Self {
            executor: QueryExecutor::new(database, config.db_trace),
            like_operator: config.db_like_operator.clone(),
            best_effort: config.search_best_effort,
        }
    }

    /// Free-text search across component, vendor and purl name.
    pub async fn get_components(
        &self,
        search: &str,
        purl_type: &str,
        limit: i32,
        offset: i32,
    ) -> Result<Vec<Component>, AppError> {
        if search.is_empty() {
            return Err(AppError::BadRequest(
                "Please specify a valid component name to query".to_string(),
            ));
        }
        let limit = clamp_component_limit(limit);
        let offset = clamp_offset(offset);
        let purl_type = default_purl_type(purl_type);

        let jobs = build_free_text_jobs(&self.like_operator, search, &purl_type, limit, offset);
        self.run_family(jobs, &purl_type, limit).await
    }

    pub async fn get_components_by_name_type(
        &self,
        comp_name: &str,
        purl_type: &str,
        limit: i32,
        offset: i32,
    ) -> Result<Vec<Component>, AppError> {
        if comp_name.is_empty() {
            return Err(AppError::BadRequest(
                "Please specify a valid component name to query".to_string(),
            ));
        }
        let limit = clamp_component_limit(limit);
        let offset = clamp_offset(offset);
        let purl_type = default_purl_type(purl_type);

        let jobs = build_name_jobs(&self.like_operator, comp_name, &purl_type, offset);
        self.run_family(jobs, &purl_type, limit).await
    }

    pub async fn get_components_by_vendor_type(
        &self,
        vendor_name: &str,
        purl_type: &str,
        limit: i32,
        offset: i32,
    ) -> Result<Vec<Component>, AppError> {
        if vendor_name.is_empty() {
            return Err(AppError::BadRequest(
                "Please specify a valid vendor name to query".to_string(),
            ));
        }
        let limit = clamp_component_limit(limit);
        let offset = clamp_offset(offset);
        let purl_type = default_purl_type(purl_type);

        let jobs = build_vendor_jobs(&self.like_operator, vendor_name, &purl_type, offset);
        self.run_family(jobs, &purl_type, limit).await
    }

    pub async fn get_components_by_name_vendor_type(
        &self,
        comp_name: &str,
        vendor: &str,
        purl_type: &str,
        limit: i32,
        offset: i32,
    ) -> Result<Vec<Component>, AppError> {
        if comp_name.is_empty() || vendor.is_empty() {
            return Err(AppError::BadRequest(
                "Please specify a valid component and vendor name to query".to_string(),
            ));
        }
        let limit = clamp_component_limit(limit);
        let offset = clamp_offset(offset);
        let purl_type = default_purl_type(purl_type);

        let jobs = build_name_vendor_jobs(&self.like_operator, comp_name, vendor, &purl_type, offset);
        self.run_family(jobs, &purl_type, limit).await
    }

    /// Inject ordering, fan out, then merge: order-preserving de-dup first,
    /// truncation to the caller limit after, URL synthesis last.
    async fn run_family(
        &self,
        jobs: Vec<QueryJob>,
        purl_type: &str,
        limit: i32,
    ) -> Result<Vec<Component>, AppError> {
        let jobs = inject_order_by(jobs, purl_type)?;
        let components = if self.best_effort {
            self.executor.run_queries_best_effort::<Component>(jobs).await?
        } else {
            self.executor.run_queries::<Component>(jobs).await?
        };

        let mut components = remove_duplicated(components);
        components.truncate(limit as usize);
        for component in &mut components {
            component.url =
                match purl_helper::project_url(&component.purl_name, &component.purl_type) {
                    Ok(url) => url,
                    Err(e) => {
                        debug!("No project URL for {}: {e}", component.purl_name);
                        String::new()
                    }
                };
        }
        Ok(components)
    }
}

/// Runs the single join query behind the versions endpoint.
pub struct AllUrlsRepository {
    executor: QueryExecutor,
}

impl AllUrlsRepository {
    pub fn new(database: &Database, config: &Config) -> Self {
        Self {
            executor: QueryExecutor::new(database, config.db_trace),
        }
    }

    pub async fn get_urls_by_purl_name_type(
        &self,
        purl_name: &str,
        purl_type: &str,
        limit: i32,
    ) -> Result<Vec<AllUrl>, AppError> {
        if purl_name.is_empty() {
            return Err(AppError::BadRequest(
                "Please specify a valid purl name to query".to_string(),
            ));
        }
        if purl_type.is_empty() {
            return Err(AppError::BadRequest(
                "Please specify a valid purl type to query".to_string(),
            ));
        }
        let limit = clamp_version_limit(limit);

        let query = "SELECT component, version, \
                     l.license_name AS license, l.spdx_id AS license_id, l.is_spdx AS is_spdx, \
                     purl_name, mine_id FROM all_urls u \
                     LEFT JOIN mines m ON u.mine_id = m.id \
                     LEFT JOIN licenses l ON u.license_id = l.id \
                     WHERE m.purl_type = $1 AND u.purl_name = $2 \
                     ORDER BY date DESC NULLS LAST LIMIT $3";
        let rows = self
            .executor
            .select::<AllUrl>(
                query,
                &[purl_type.into(), purl_name.into(), limit.into()],
            )
            .await?;
        debug!("Found {} results for {purl_type}, {purl_name}", rows.len());
        Ok(rows)
    }
}

fn clamp_component_limit(limit: i32) -> i32 {
    if limit > DEFAULT_MAX_COMPONENT_LIMIT || limit <= 0 {
        DEFAULT_MAX_COMPONENT_LIMIT
    } else {
        limit
    }
}

fn clamp_version_limit(limit: i32) -> i32 {
    if limit > DEFAULT_MAX_VERSION_LIMIT || limit <= 0 {
        DEFAULT_MAX_VERSION_LIMIT
    } else {
        limit
    }
}

fn clamp_offset(offset: i32) -> i32 {
    offset.max(0)
}

fn default_purl_type(purl_type: &str) -> String {
    if purl_type.is_empty() {
        DEFAULT_PURL_TYPE.to_string()
    } else {
        purl_type.to_string()
    }
}

fn order_by_clause(purl_type: &str) -> &'static str {
    match purl_type {
        "github" => {
            "ORDER BY git_created_at NULLS LAST, git_forks DESC NULLS LAST, git_stars DESC NULLS LAST"
        }
        "pypi" | "npm" | "gem" => "ORDER BY first_version_date NULLS LAST, versions NULLS LAST",
        _ => "",
    }
}

/// Replace the `#ORDER` marker in each statement with the per-ecosystem
/// ordering clause. The marker is replaced exactly once; an unknown
/// ecosystem gets an empty clause.
fn inject_order_by(jobs: Vec<QueryJob>, purl_type: &str) -> Result<Vec<QueryJob>, AppError> {
    if jobs.is_empty() {
        return Err(AppError::QueryError(
            "cannot pre process an empty query job list".to_string(),
        ));
    }
    let clause = order_by_clause(purl_type);
    Ok(jobs
        .into_iter()
        .map(|mut job| {
            job.query = job.query.replacen("#ORDER", clause, 1).trim_end().to_string();
            job
        })
        .collect())
}

/// Order-preserving de-duplication: the first occurrence of each distinct
/// record wins. Distinct is the full tuple, so rows differing only in url
/// are both kept.
fn remove_duplicated(components: Vec<Component>) -> Vec<Component> {
    let mut seen = HashSet::new();
    components
        .into_iter()
        .filter(|component| seen.insert(component.clone()))
        .collect()
}

fn build_free_text_jobs(
    like: &str,
    search: &str,
    purl_type: &str,
    limit: i32,
    offset: i32,
) -> Vec<QueryJob> {
    vec![
        QueryJob {
            query: format!(
                "SELECT p.component, p.purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.component {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![search.into(), purl_type.into(), limit.into(), offset.into()],
        },
        QueryJob {
            query: format!(
                "SELECT p.component, p.purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.vendor {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![search.into(), purl_type.into(), limit.into(), offset.into()],
        },
        QueryJob {
            query: format!(
                "SELECT p.component, p.purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.purl_name {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![
                format!("%{search}%{search}%").into(),
                purl_type.into(),
                QueryArg::Int(1),
                offset.into(),
            ],
        },
        QueryJob {
            query: format!(
                "SELECT p.component, p.purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.purl_name {like} $1 AND p.purl_name NOT {like} $2 \
                 AND m.purl_type = $3 #ORDER LIMIT $4 OFFSET $5"
            ),
            args: vec![
                format!("%{search}%").into(),
                format!("%{search}%{search}%").into(),
                purl_type.into(),
                QueryArg::Int(1),
                offset.into(),
            ],
        },
        QueryJob {
            query: format!(
                "SELECT p.component, p.purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.purl_name {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![
                format!("{search}%").into(),
                purl_type.into(),
                QueryArg::Int(1),
                offset.into(),
            ],
        },
        QueryJob {
            query: format!(
                "SELECT p.component, p.purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.purl_name {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![
                format!("%{search}").into(),
                purl_type.into(),
                QueryArg::Int(1),
                offset.into(),
            ],
        },
    ]
}

fn build_name_jobs(like: &str, comp_name: &str, purl_type: &str, offset: i32) -> Vec<QueryJob> {
    let patterns = [
        comp_name.to_string(),
        format!("%{comp_name}%"),
        format!("{comp_name}%"),
        format!("%{comp_name}"),
    ];
    patterns
        .into_iter()
        .map(|pattern| QueryJob {
            query: format!(
                "SELECT component, purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.component {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![pattern.into(), purl_type.into(), QueryArg::Int(1), offset.into()],
        })
        .collect()
}

fn build_vendor_jobs(like: &str, vendor_name: &str, purl_type: &str, offset: i32) -> Vec<QueryJob> {
    let mut jobs = vec![QueryJob {
        query: "SELECT component, purl_name, m.purl_type FROM projects p \
                LEFT JOIN mines m ON p.mine_id = m.id \
                WHERE p.vendor = $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            .to_string(),
        args: vec![
            vendor_name.into(),
            purl_type.into(),
            QueryArg::Int(1),
            offset.into(),
        ],
    }];
    for pattern in [
        format!("%{vendor_name}%"),
        format!("{vendor_name}%"),
        format!("%{vendor_name}"),
    ] {
        jobs.push(QueryJob {
            query: format!(
                "SELECT component, purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.vendor {like} $1 AND m.purl_type = $2 #ORDER LIMIT $3 OFFSET $4"
            ),
            args: vec![pattern.into(), purl_type.into(), QueryArg::Int(1), offset.into()],
        });
    }
    jobs
}

fn build_name_vendor_jobs(
    like: &str,
    comp_name: &str,
    vendor: &str,
    purl_type: &str,
    offset: i32,
) -> Vec<QueryJob> {
    let pairs = [
        (vendor.to_string(), comp_name.to_string()),
        (format!("%{vendor}%"), format!("%{comp_name}%")),
    ];
    pairs
        .into_iter()
        .map(|(vendor_pattern, comp_pattern)| QueryJob {
            query: format!(
                "SELECT component, purl_name, m.purl_type FROM projects p \
                 LEFT JOIN mines m ON p.mine_id = m.id \
                 WHERE p.vendor {like} $1 AND p.component {like} $2 \
                 AND m.purl_type = $3 #ORDER LIMIT $4 OFFSET $5"
            ),
            args: vec![
                vendor_pattern.into(),
                comp_pattern.into(),
                purl_type.into(),
                QueryArg::Int(1),
                offset.into(),
            ],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, purl_name: &str, purl_type: &str) -> Component {
        Component {
            component: name.to_string(),
            purl_name: purl_name.to_string(),
            purl_type: purl_type.to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn test_clamp_limits() {
        assert_eq!(clamp_component_limit(0), 50);
        assert_eq!(clamp_component_limit(-5), 50);
        assert_eq!(clamp_component_limit(51), 50);
        assert_eq!(clamp_component_limit(20), 20);
        assert_eq!(clamp_version_limit(0), 50);
        assert_eq!(clamp_version_limit(2), 2);
        assert_eq!(clamp_offset(-1), 0);
        assert_eq!(clamp_offset(7), 7);
    }

    #[test]
    fn test_default_purl_type() {
        assert_eq!(default_purl_type(""), "github");
        assert_eq!(default_purl_type("npm"), "npm");
    }

    #[test]
    fn test_free_text_family_shape() {
        let jobs = build_free_text_jobs("ILIKE", "angular", "github", 20, 0);
        assert_eq!(jobs.len(), 6);
        for job in &jobs {
            assert!(job.query.contains("ILIKE"));
            assert!(job.query.contains("#ORDER"));
            assert!(job.query.contains("m.purl_type ="));
        }
        // Exact-name and vendor queries carry the caller limit, the
        // substring variants run with a per-query limit of 1.
        let limits: Vec<String> = jobs
            .iter()
            .map(|job| format!("{:?}", job.args[job.args.len() - 2]))
            .collect();
        assert_eq!(limits[0], "Int(20)");
        assert_eq!(limits[1], "Int(20)");
        assert_eq!(limits[2], "Int(1)");
        assert_eq!(limits[5], "Int(1)");
    }

    #[test]
    fn test_single_occurrence_query_excludes_doubled_pattern() {
        let jobs = build_free_text_jobs("LIKE", "ng", "github", 10, 0);
        assert!(jobs[3].query.contains("NOT LIKE"));
        assert!(matches!(&jobs[3].args[0], QueryArg::Text(p) if p == "%ng%"));
        assert!(matches!(&jobs[3].args[1], QueryArg::Text(p) if p == "%ng%ng%"));
    }

    #[test]
    fn test_vendor_family_first_query_is_exact_match() {
        let jobs = build_vendor_jobs("LIKE", "scanoss", "github", 0);
        assert_eq!(jobs.len(), 4);
        assert!(jobs[0].query.contains("p.vendor = $1"));
        assert!(jobs[1].query.contains("p.vendor LIKE $1"));
    }

    #[test]
    fn test_inject_order_by_github() {
        let jobs = vec![QueryJob {
            query: "SELECT 1 #ORDER LIMIT $1".to_string(),
            args: vec![],
        }];
        let jobs = inject_order_by(jobs, "github").unwrap();
        assert_eq!(
            jobs[0].query,
            "SELECT 1 ORDER BY git_created_at NULLS LAST, git_forks DESC NULLS LAST, \
             git_stars DESC NULLS LAST LIMIT $1"
        );
    }

    #[test]
    fn test_inject_order_by_registry_types() {
        for purl_type in ["pypi", "npm", "gem"] {
            let jobs = vec![QueryJob {
                query: "SELECT 1 #ORDER".to_string(),
                args: vec![],
            }];
            let jobs = inject_order_by(jobs, purl_type).unwrap();
            assert_eq!(
                jobs[0].query,
                "SELECT 1 ORDER BY first_version_date NULLS LAST, versions NULLS LAST"
            );
        }
    }

    #[test]
    fn test_inject_order_by_unknown_type_removes_marker() {
        let jobs = vec![QueryJob {
            query: "SELECT 1 #ORDER".to_string(),
            args: vec![],
        }];
        let jobs = inject_order_by(jobs, "maven").unwrap();
        assert_eq!(jobs[0].query, "SELECT 1");
    }

    #[test]
    fn test_inject_order_by_replaces_only_once() {
        let jobs = vec![QueryJob {
            query: "#ORDER #ORDER".to_string(),
            args: vec![],
        }];
        let jobs = inject_order_by(jobs, "maven").unwrap();
        assert_eq!(jobs[0].query, " #ORDER");
    }

    #[test]
    fn test_inject_order_by_rejects_empty_job_list() {
        assert!(inject_order_by(vec![], "github").is_err());
    }

    #[test]
    fn test_remove_duplicated_keeps_first_occurrence() {
        let input = vec![
            component("angular", "angular/angular", "github"),
            component("angular.js", "angular/angular.js", "github"),
            component("angular", "angular/angular", "github"),
            component("angular", "angular", "npm"),
        ];
        let output = remove_duplicated(input);
        assert_eq!(output.len(), 3);
        assert_eq!(output[0].purl_name, "angular/angular");
        assert_eq!(output[1].purl_name, "angular/angular.js");
        assert_eq!(output[2].purl_type, "npm");
    }

    #[test]
    fn test_remove_duplicated_is_idempotent() {
        let input = vec![
            component("a", "v/a", "github"),
            component("a", "v/a", "github"),
            component("b", "v/b", "github"),
        ];
        let once = remove_duplicated(input);
        let twice = remove_duplicated(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_records_differing_only_in_url_are_both_kept() {
        let mut first = component("a", "v/a", "github");
        first.url = "https://github.com/v/a".to_string();
        let second = component("a", "v/a", "github");
        let output = remove_duplicated(vec![first.clone(), second.clone()]);
        assert_eq!(output, vec![first, second]);
    }
}

use crate::domain::model::Dataset;

/// Free-text catalog search over title, description and domains.
///
/// A blank query matches everything.
pub fn search<'a>(datasets: &'a [Dataset], query: &str) -> Vec<&'a Dataset> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return datasets.iter().collect();
    }

    datasets
        .iter()
        .filter(|d| {
            d.title.to_lowercase().contains(&query)
                || d.description.to_lowercase().contains(&query)
                || d.domains.iter().any(|domain| domain.to_lowercase().contains(&query))
        })
        .collect()
}

/// Datasets with a domain containing the category name, ignoring case.
pub fn filter_by_category<'a>(datasets: &'a [Dataset], category: &str) -> Vec<&'a Dataset> {
    let category = category.trim().to_lowercase();
    datasets
        .iter()
        .filter(|d| d.domains.iter().any(|domain| domain.to_lowercase().contains(&category)))
        .collect()
}

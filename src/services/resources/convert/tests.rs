use super::*;
use crate::testing::{ProjectView, project_object, project_object_with_owner};
use serde::Deserialize;

#[test]
fn test_typed_list_conversion() {
    let objects = vec![
        project_object_with_owner("alpha", "default", "alice"),
        project_object("beta", "default"),
    ];

    let views: Vec<ProjectView> =
        to_typed_list(&objects).expect("Conversion should succeed");

    assert_eq!(views.len(), 2);
    assert_eq!(views[0].name(), "alpha");
    assert_eq!(views[0].spec.owner.as_deref(), Some("alice"));
    assert_eq!(views[1].spec.owner, None);
}

#[derive(Debug, Deserialize)]
struct StrictView {
    #[allow(dead_code)]
    spec: StrictSpec,
}

#[derive(Debug, Deserialize)]
struct StrictSpec {
    #[allow(dead_code)]
    owner: String,
}

#[test]
fn test_typed_list_fails_on_the_first_misfit() {
    let objects = vec![
        project_object_with_owner("alpha", "default", "alice"),
        project_object("beta", "default"),
    ];

    let result: Result<Vec<StrictView>, Status> = to_typed_list(&objects);

    assert!(matches!(result, Err(Status::ConversionError(_))));
}

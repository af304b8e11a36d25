use super::*;
use serde_json::json;

fn square() -> PlotGeometry {
    PlotGeometry::Polygon(vec![vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0],
    ]])
}

fn sample_plot() -> Plot {
    Plot {
        id: 7,
        name: "Plot A-7".to_string(),
        area: 1250.5,
        plot_type: IndustryType::Chemical.into(),
        status: "available".to_string(),
        disroad: 120.0,
        diswater: 840.0,
        elephase: 3.0,
        geometry: square(),
    }
}

fn sample_input() -> PlotInput {
    PlotInput {
        id: None,
        name: "Plot B-1".to_string(),
        area: 10.0,
        plot_type: "IT".to_string(),
        status: "allotted".to_string(),
        disroad: 1.0,
        diswater: 2.0,
        elephase: 3.0,
        geom: json!({"type": "Polygon", "coordinates": []}),
    }
}

#[test]
fn test_industry_type_tags() {
    assert_eq!("chemical".parse::<IndustryType>(), Ok(IndustryType::Chemical));
    assert_eq!("textile".parse::<IndustryType>(), Ok(IndustryType::Textile));
    assert_eq!("IT".parse::<IndustryType>(), Ok(IndustryType::It));
    assert_eq!("automobile".parse::<IndustryType>(), Ok(IndustryType::Automobile));
    assert_eq!("paper".parse::<IndustryType>(), Ok(IndustryType::Paper));

    for t in IndustryType::ALL {
        assert_eq!(t.as_str().parse::<IndustryType>(), Ok(t));
        assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
    }
}

#[test]
fn test_industry_type_is_case_sensitive() {
    assert_eq!(
        "Chemical".parse::<IndustryType>(),
        Err(ValidationError::UnknownIndustryType("Chemical".to_string()))
    );
    assert!("it".parse::<IndustryType>().is_err());
    assert!("Chemical Industry".parse::<IndustryType>().is_err());
}

#[test]
fn test_feature_shape() {
    let value = serde_json::to_value(sample_plot().to_feature()).unwrap();

    assert_eq!(value["type"], "Feature");
    assert_eq!(value["geometry"]["type"], "Polygon");
    assert_eq!(
        value["properties"],
        json!({
            "id": 7,
            "name": "Plot A-7",
            "area": 1250.5,
            "type": "chemical",
            "status": "available",
            "disroad": 120.0,
            "diswater": 840.0,
            "elephase": 3.0
        })
    );
}

#[test]
fn test_feature_collection_from_plots() {
    let mut second = sample_plot();
    second.id = 8;
    second.plot_type = IndustryType::Textile.into();

    let collection = FeatureCollection::from_plots(&[sample_plot(), second]);
    let value = serde_json::to_value(&collection).unwrap();

    assert_eq!(collection.len(), 2);
    assert_eq!(value["type"], "FeatureCollection");
    assert_eq!(value["features"][1]["properties"]["id"], 8);
    assert_eq!(value["features"][1]["properties"]["type"], "textile");
}

#[test]
fn test_single_feature_collection() {
    let collection = FeatureCollection::single(&sample_plot());
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.features[0].properties.id, 7);

    assert!(FeatureCollection::from_plots(&[]).is_empty());
}

#[test]
fn test_plot_input_accepts_null_id() {
    let input: PlotInput = serde_json::from_value(json!({
        "id": null,
        "name": "A",
        "area": 10,
        "type": "IT",
        "status": "available",
        "disroad": 1,
        "diswater": 2,
        "elephase": 3,
        "geom": {"type": "Polygon", "coordinates": []}
    }))
    .unwrap();

    assert_eq!(input.id, None);
    assert_eq!(input.area, 10.0);
}

#[test]
fn test_plot_input_without_id_field() {
    let input: PlotInput = serde_json::from_value(json!({
        "name": "A",
        "area": 10.5,
        "type": "chemical",
        "status": "available",
        "disroad": 1,
        "diswater": 2,
        "elephase": 3,
        "geom": null
    }))
    .unwrap();

    assert_eq!(input.id, None);
    assert_eq!(input.plot_type, "chemical");
}

#[test]
fn test_plot_input_accepts_textual_elephase() {
    let input: PlotInput = serde_json::from_value(json!({
        "name": "A",
        "area": 10.5,
        "type": "chemical",
        "status": "available",
        "disroad": 1,
        "diswater": 2,
        "elephase": "3",
        "geom": null
    }))
    .unwrap();

    assert_eq!(input.elephase, 3.0);
}

#[test]
fn test_plot_input_rejects_non_numeric_elephase() {
    let result = serde_json::from_value::<PlotInput>(json!({
        "name": "A",
        "area": 10.5,
        "type": "chemical",
        "status": "available",
        "disroad": 1,
        "diswater": 2,
        "elephase": "three",
        "geom": null
    }));

    assert!(result.is_err());
}

#[test]
fn test_stored_type_keeps_unknown_tags() {
    assert_eq!(PlotType::from("IT".to_string()), PlotType::Known(IndustryType::It));
    assert_eq!(
        PlotType::from("Steel Industry".to_string()),
        PlotType::Other("Steel Industry".to_string())
    );
    assert_eq!(PlotType::from("paper".to_string()), IndustryType::Paper);

    // Serializes as the bare tag in both cases
    assert_eq!(
        serde_json::to_value(PlotType::Known(IndustryType::It)).unwrap(),
        json!("IT")
    );
    assert_eq!(
        serde_json::to_value(PlotType::Other("Steel Industry".to_string())).unwrap(),
        json!("Steel Industry")
    );
    let parsed: PlotType = serde_json::from_value(json!("textile")).unwrap();
    assert_eq!(parsed, PlotType::Known(IndustryType::Textile));
}

#[test]
fn test_validate_returns_industry_type() {
    assert_eq!(validate(&sample_input()), Ok(IndustryType::It));
}

#[test]
fn test_validate_rejects_unknown_type() {
    let mut input = sample_input();
    input.plot_type = "mining".to_string();

    assert_eq!(
        validate(&input),
        Err(ValidationError::UnknownIndustryType("mining".to_string()))
    );
}

#[test]
fn test_validate_rejects_non_positive_id() {
    let mut input = sample_input();
    input.id = Some(0);

    assert_eq!(validate(&input), Err(ValidationError::InvalidId(0)));
}

#[test]
fn test_validate_rejects_non_finite_numbers() {
    let mut input = sample_input();
    input.diswater = f64::INFINITY;

    assert_eq!(
        validate(&input),
        Err(ValidationError::NonFiniteAttribute("diswater"))
    );
}

//! Integration tests for scene parsing and layout

use pretty_assertions::assert_eq;
use scene::{parse_document, Affine, Point, SceneIndex, SceneKind};

const BOOKLET: &str = r#"{
    "name": "Field guide",
    "page_width": 4.25,
    "page_height": 5.5,
    "imposition": { "kind": "side-by-side", "pages_per_spread": 2 },
    "printer_marks": true,
    "pages": [
        { "layers": [ { "id": 1, "type": "group", "children": [
            { "id": 2, "type": "gradient", "p1": 0, "p2": 2,
              "stops": [ {"position": 0, "color": {"r": 1, "g": 0, "b": 0}},
                         {"position": 1, "color": {"r": 0, "g": 0, "b": 1}} ] }
        ] } ] },
        { "layers": [ { "id": 3, "type": "reference", "target": 100,
                        "transform": [1, 0, 0, 1, 0.5, 0.5] } ], "clips": true },
        { "layers": [] }
    ],
    "paper_group": {
        "name": "Letter landscape",
        "papers": [ { "paper": { "name": "Letter", "width": 11, "height": 8.5 },
                      "color": { "r": 1, "g": 1, "b": 0.9 } } ],
        "objects": [ { "id": 50, "type": "caption", "lines": ["DRAFT"],
                       "font": { "family": "Sans" } } ]
    },
    "library": [
        { "id": 100, "type": "paths",
          "paths": [ { "points": [ {"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 1, "y": 1} ] } ],
          "line": { "width": 0.02 } }
    ]
}"#;

#[test]
fn test_booklet_spreads() {
    let doc = parse_document(BOOKLET).unwrap();
    assert_eq!(doc.num_spreads(), 2);

    let first = doc.layout(0).unwrap();
    assert_eq!(first.pages.len(), 2);
    assert_eq!(first.pages[1].transform, Affine::translate(4.25, 0.0));
    assert!(first.marks.is_some());

    let second = doc.layout(1).unwrap();
    assert_eq!(second.pages.len(), 1);
    assert_eq!(second.pages[0].index, 2);
    assert!(doc.layout(2).is_none());
}

#[test]
fn test_booklet_index_and_references() {
    let doc = parse_document(BOOKLET).unwrap();
    let mut index = SceneIndex::new();
    doc.index_into(&mut index);

    for id in [1, 2, 3, 50, 100] {
        assert!(index.get(id).is_some(), "node {id} not indexed");
    }

    let reference = index.get(3).unwrap();
    let target = match &reference.kind {
        SceneKind::Reference(r) => index.get(r.target).unwrap(),
        other => panic!("expected reference, got {other:?}"),
    };
    assert_eq!(target.type_name(), "PathsData");
    assert!(target.transform.is_identity());
    assert_eq!(
        reference.transform.transform_point(Point::new(0.0, 0.0)),
        Point::new(0.5, 0.5)
    );
}

#[test]
fn test_booklet_paper_color() {
    let doc = parse_document(BOOKLET).unwrap();
    let paper = &doc.paper_group.papers[0];
    assert!(!paper.color.is_white());
    assert_eq!(paper.paper.width, 11.0);
}

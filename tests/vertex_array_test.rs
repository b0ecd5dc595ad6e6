use reef_viewer::data_structures::mesh::{Attribute, GpuError, VertexArray};

#[test]
fn counts_rows_of_matching_attributes() {
    let attributes = [
        Some(Attribute::vec3(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])),
        None,
        Some(Attribute::vec2(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])),
    ];
    assert_eq!(VertexArray::vertex_count(&attributes).unwrap(), 3);
}

#[test]
fn no_attributes_means_no_vertices() {
    assert_eq!(VertexArray::vertex_count(&[]).unwrap(), 0);
    assert_eq!(VertexArray::vertex_count(&[None, None]).unwrap(), 0);
}

#[test]
fn mismatched_row_counts_fail() {
    let attributes = [
        Some(Attribute::vec3(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])),
        Some(Attribute::vec3(&[[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]])),
    ];
    match VertexArray::vertex_count(&attributes) {
        Err(GpuError::AttributeLength {
            location,
            rows,
            expected,
        }) => {
            assert_eq!(location, 1);
            assert_eq!(rows, 2);
            assert_eq!(expected, 3);
        }
        other => panic!("expected AttributeLength, got {other:?}"),
    }
}

#[test]
fn ragged_data_fails() {
    let attributes = [Some(Attribute::new(vec![0.0; 7], 3))];
    assert!(matches!(
        VertexArray::vertex_count(&attributes),
        Err(GpuError::RaggedAttribute {
            location: 0,
            len: 7,
            components: 3
        })
    ));
}

#[test]
fn component_count_must_fit_a_vertex_format() {
    for components in [0, 5] {
        let attributes = [Some(Attribute::new(vec![0.0; 10], components))];
        assert!(matches!(
            VertexArray::vertex_count(&attributes),
            Err(GpuError::ComponentCount { .. })
        ));
    }
}

#[test]
fn attribute_rows() {
    assert_eq!(Attribute::vec2(&[[1.0, 2.0], [3.0, 4.0]]).rows(), 2);
    assert_eq!(Attribute::new(vec![1.0, 2.0, 3.0, 4.0], 4).rows(), 1);
}

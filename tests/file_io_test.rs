//! On-disk format coverage: round trips through files and readers, header
//! type enforcement, and rejection of corrupted payloads.

use runcol::{Layout, MajorOrder, MatrixError, Metadata, SparseMatrix, METADATA_LEN};

fn sample() -> SparseMatrix<i64> {
    SparseMatrix::from_triplets(
        6,
        3,
        &[(0, 0, 4), (2, 0, 4), (5, 0, -1), (1, 2, 9), (4, 2, 9)],
        Layout::Packed,
    )
    .expect("sample build")
}

#[test]
fn files_round_trip_on_disk() {
    let dir = tempfile::tempdir().expect("temp dir");

    for (layout, name) in [(Layout::Packed, "packed.mat"), (Layout::Counted, "counted.mat")] {
        let matrix = sample().to_layout(layout).expect("layout");
        let path = dir.path().join(name);

        matrix.write_to_path(&path).expect("write file");
        let reloaded = SparseMatrix::<i64>::read_from_path(&path).expect("read file");

        assert_eq!(reloaded, matrix);
        assert_eq!(reloaded.layout(), layout);
        assert_eq!(reloaded.to_bytes().expect("bytes"), matrix.to_bytes().expect("bytes"));
    }
}

#[test]
fn writer_and_reader_match_the_byte_form() {
    let matrix = sample();

    let mut buffer = Vec::new();
    matrix.write_to(&mut buffer).expect("write");
    assert_eq!(buffer, matrix.to_bytes().expect("serialize"));

    let mut cursor = buffer.as_slice();
    let streamed = SparseMatrix::<i64>::read_from(&mut cursor).expect("read");
    assert_eq!(streamed, matrix);
}

#[test]
fn alternate_index_and_value_types_round_trip() {
    let narrow = SparseMatrix::<f32, u16>::from_triplets(
        300,
        2,
        &[(0, 0, 1.5), (299, 0, 1.5), (7, 1, -2.25)],
        Layout::Counted,
    )
    .expect("u16-indexed build");
    let bytes = narrow.to_bytes().expect("serialize");
    assert_eq!(
        SparseMatrix::<f32, u16>::from_bytes(&bytes).expect("deserialize"),
        narrow
    );

    let wide = SparseMatrix::<u8, u64>::from_triplets(
        100_000,
        1,
        &[(0, 0, 3), (99_999, 0, 3)],
        Layout::Packed,
    )
    .expect("u64-indexed build");
    let bytes = wide.to_bytes().expect("serialize");
    assert_eq!(
        SparseMatrix::<u8, u64>::from_bytes(&bytes).expect("deserialize"),
        wide
    );
}

#[test]
fn fully_dense_and_fully_empty_matrices_round_trip() {
    for layout in [Layout::Packed, Layout::Counted] {
        let dense_triplets: Vec<(usize, usize, i32)> = (0..5)
            .flat_map(|r| (0..4).map(move |c| (r, c, (r * 4 + c) as i32 + 1)))
            .collect();
        let dense = SparseMatrix::<i32>::from_triplets(5, 4, &dense_triplets, layout)
            .expect("dense build");
        assert_eq!(dense.nnz(), 20);
        let bytes = dense.to_bytes().expect("serialize");
        assert_eq!(SparseMatrix::<i32>::from_bytes(&bytes).expect("deserialize"), dense);

        let empty =
            SparseMatrix::<i32>::from_triplets(5, 4, &[], layout).expect("empty build");
        let bytes = empty.to_bytes().expect("serialize");
        let reloaded = SparseMatrix::<i32>::from_bytes(&bytes).expect("deserialize");
        assert_eq!(reloaded.nnz(), 0);
        assert_eq!(reloaded, empty);
    }
}

#[test]
fn header_type_tags_are_enforced() {
    let bytes = sample().to_bytes().expect("serialize");

    // Same width, wrong float flag; narrower integer; wrong index width.
    let err = SparseMatrix::<f64>::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, MatrixError::UnsupportedValueType(_)));

    let err = SparseMatrix::<i16>::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, MatrixError::UnsupportedValueType(_)));

    let err = SparseMatrix::<i64, u16>::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, MatrixError::UnsupportedValueType(_)));
}

#[test]
fn corrupted_payloads_are_rejected() {
    let matrix = sample();
    let bytes = matrix.to_bytes().expect("serialize");

    // Truncation anywhere in the payload.
    let err = SparseMatrix::<i64>::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, MatrixError::CorruptStream(_)));

    // Bytes past the declared columns.
    let mut padded = bytes.clone();
    padded.push(0);
    let err = SparseMatrix::<i64>::from_bytes(&padded).unwrap_err();
    assert!(matches!(err, MatrixError::CorruptStream(_)));

    // Header nonzero count out of step with the streams.
    let mut lied = bytes.clone();
    lied[12] = lied[12].wrapping_add(1);
    let err = SparseMatrix::<i64>::from_bytes(&lied).unwrap_err();
    assert!(matches!(err, MatrixError::CorruptStream(_)));

    // Width byte outside {1, 2, 4, 8}. The first column's stream starts
    // after the header and the three-column length table.
    let width_pos = METADATA_LEN + 3 * 8 + 8;
    let mut bad_width = bytes;
    assert_eq!(bad_width[width_pos], 1);
    bad_width[width_pos] = 3;
    let err = SparseMatrix::<i64>::from_bytes(&bad_width).unwrap_err();
    assert!(matches!(err, MatrixError::CorruptStream(_)));
}

#[test]
fn counted_files_lay_out_tables_then_sections() {
    let matrix = SparseMatrix::<i32>::from_triplets(
        3,
        2,
        &[(0, 0, 7), (1, 0, 7), (2, 0, 2)],
        Layout::Counted,
    )
    .expect("build");
    let bytes = matrix.to_bytes().expect("serialize");

    // Header, two u32 tables, then values, counts, and indices. Column 0
    // holds runs {7: [0, 1], 2: [2]}; column 1 is empty.
    assert_eq!(bytes.len(), METADATA_LEN + 8 + 8 + 8 + 8 + 12);
    assert_eq!(&bytes[24..32], &[2, 0, 0, 0, 0, 0, 0, 0]); // value counts [2, 0]
    assert_eq!(&bytes[32..40], &[3, 0, 0, 0, 0, 0, 0, 0]); // index counts [3, 0]
    assert_eq!(&bytes[40..44], &7i32.to_le_bytes()); // first stored value

    // An inner index at or past the inner dimension fails validation.
    let mut bad_index = bytes;
    assert_eq!(bad_index[56], 0);
    bad_index[56] = 5;
    let err = SparseMatrix::<i32>::from_bytes(&bad_index).unwrap_err();
    assert!(matches!(err, MatrixError::CorruptStream(_)));
}

#[test]
fn decoder_accepts_widths_the_encoder_never_picks() {
    // A foreign writer may pad every index field to eight bytes. The width
    // byte is authoritative, so the stream still decodes.
    let meta = Metadata::new::<i32, u32>(Layout::Packed, MajorOrder::ColumnMajor, 10, 1, 1)
        .expect("header");
    let mut bytes = Vec::new();
    meta.write_le(&mut bytes);
    bytes.extend_from_slice(&21u64.to_le_bytes()); // column stream length
    bytes.extend_from_slice(&7i32.to_le_bytes());
    bytes.push(8);
    bytes.extend_from_slice(&3u64.to_le_bytes()); // start index
    bytes.extend_from_slice(&0u64.to_le_bytes()); // terminator

    let matrix = SparseMatrix::<i32>::from_bytes(&bytes).expect("wide-field stream");
    assert_eq!(matrix.nnz(), 1);
    assert_eq!(matrix.coeff(3, 0).expect("coeff"), 7);

    // Re-encoding normalizes to the minimal width.
    let reencoded = SparseMatrix::from_csc(&matrix.to_csc().expect("export"), Layout::Packed)
        .expect("rebuild");
    let bytes = reencoded.to_bytes().expect("serialize");
    assert_eq!(bytes.len(), METADATA_LEN + 8 + 7);
}

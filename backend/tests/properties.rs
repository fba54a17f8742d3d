use passboard::pipeline::totals_by_entity;
use passboard::transform::KNOWN_REGIONS;
use passboard::{
    detect_layout, embed_blocks, extract_blocks, melt, BlockSpec, MeltOptions, OutletRecord,
    StaggeredBlockLayout, WideTable, DEFAULT_BLOCK_WIDTH,
};
use proptest::prelude::*;

fn wide_table(rows: &[Vec<u32>], columns: usize) -> WideTable {
    let mut headers = vec!["Entity".to_string()];
    headers.extend((0..columns).map(|c| format!("C{}", c)));

    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, values)| {
            let mut row = vec![format!("E{}", i)];
            row.extend(values.iter().map(|v| v.to_string()));
            row
        })
        .collect();

    WideTable::new(headers, rows).unwrap()
}

fn table_strategy() -> impl Strategy<Value = (usize, Vec<Vec<u32>>)> {
    (1usize..6).prop_flat_map(|columns| {
        let row = proptest::collection::vec(0u32..1000, columns);
        (Just(columns), proptest::collection::vec(row, 0..12))
    })
}

fn blocks_strategy() -> impl Strategy<Value = Vec<Vec<(String, u16, u16)>>> {
    let outlet = ("[A-Z]{2}", any::<u16>(), any::<u16>());
    proptest::collection::vec(proptest::collection::vec(outlet, 0..6), 1..=KNOWN_REGIONS.len())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn melt_row_count((columns, rows) in table_strategy(), drop_zero in any::<bool>()) {
        let table = wide_table(&rows, columns);
        let options = MeltOptions { drop_zero };
        let records = melt(&table, "Entity", &options).unwrap();

        let zeros = rows.iter().flatten().filter(|v| **v == 0).count();
        let expected = rows.len() * columns - if drop_zero { zeros } else { 0 };
        prop_assert_eq!(records.len(), expected);
    }

    #[test]
    fn melt_preserves_row_sums((columns, rows) in table_strategy()) {
        let table = wide_table(&rows, columns);
        let records = melt(&table, "Entity", &MeltOptions::default()).unwrap();
        let totals = totals_by_entity(&records);

        let expected: Vec<(String, u64)> = rows
            .iter()
            .enumerate()
            .filter(|(_, values)| !values.is_empty())
            .map(|(i, values)| (format!("E{}", i), values.iter().map(|v| *v as u64).sum()))
            .collect();
        prop_assert_eq!(totals, expected);
    }

    #[test]
    fn extract_embed_extract_is_stable(blocks in blocks_strategy()) {
        let layout = StaggeredBlockLayout::new(
            (0..blocks.len())
                .map(|i| BlockSpec::new(i * (DEFAULT_BLOCK_WIDTH + 1), KNOWN_REGIONS[i]))
                .collect(),
        );
        let records: Vec<OutletRecord> = blocks
            .iter()
            .enumerate()
            .flat_map(|(i, outlets)| {
                outlets.iter().map(move |(name, pass, fail)| OutletRecord {
                    outlet: name.clone(),
                    pass: *pass as u64,
                    fail: *fail as u64,
                    region: KNOWN_REGIONS[i].to_string(),
                })
            })
            .collect();

        let grid = embed_blocks(&records, &layout).unwrap();
        let first = extract_blocks(&grid, &layout).unwrap();
        prop_assert_eq!(&first, &records);

        let again = embed_blocks(&first, &layout).unwrap();
        prop_assert_eq!(extract_blocks(&again, &layout).unwrap(), first);

        // Headers written by the embedder are found again by detection.
        prop_assert_eq!(detect_layout(&grid, DEFAULT_BLOCK_WIDTH), layout);
    }
}

use crate::error::DatasetError;
use crate::lstm::step_1_tensor_preparation::{
    build_windows, partition_windows, prepare_dataset, DatasetConfig, LotkaVolterraDataset,
};
use crate::util::test_utils::{linear_trajectory, random_trajectory};

fn configs() -> Vec<DatasetConfig> {
    let mut configs = Vec::new();
    for sequence_length in [1, 3, 12] {
        for shift in [1, 2, 5] {
            for sample_size in [1, 7, 40, 2000] {
                configs.push(DatasetConfig::new(sequence_length, shift, sample_size));
            }
        }
    }
    configs
}

fn all_starts(dataset: &LotkaVolterraDataset) -> (Vec<usize>, Vec<usize>) {
    let head: Vec<usize> = dataset
        .train
        .window_starts
        .iter()
        .chain(dataset.validation.window_starts.iter())
        .copied()
        .collect();
    (head, dataset.test.window_starts.clone())
}

#[test]
fn test_window_count_formula() {
    for len in [0usize, 5, 14, 15, 16, 100, 257] {
        let trajectory = random_trajectory(len, len as u64);
        for config in configs() {
            let expected = len.saturating_sub(config.sequence_length + config.shift);
            match build_windows(&trajectory, &config) {
                Ok(windows) => assert_eq!(windows.len(), expected),
                Err(DatasetError::InsufficientData { .. }) => assert_eq!(expected, 0),
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }
}

#[test]
fn test_targets_are_shift_steps_past_inputs() {
    let trajectory = random_trajectory(80, 11);
    for config in configs() {
        let windows = build_windows(&trajectory, &config).unwrap();
        for w in windows {
            let last = w.start + config.sequence_length - 1;
            assert_eq!(w.inputs.as_slice(), &trajectory[w.start..=last]);
            assert_eq!(w.target, trajectory[last + config.shift]);
        }
    }
}

#[test]
fn test_split_sizes_and_ordering() {
    let trajectory = random_trajectory(300, 3);
    for config in configs() {
        let dataset = prepare_dataset(&trajectory, &config).unwrap();
        let total = 300 - config.sequence_length - config.shift;
        let head = total * 4 / 5;
        let pool = config.sample_size.min(head);

        assert_eq!(dataset.total_windows, total);
        assert_eq!(dataset.head_windows, head);
        assert_eq!(dataset.train.len() + dataset.validation.len(), pool);
        assert_eq!(dataset.train.len(), pool * 4 / 5);
        assert_eq!(
            dataset.test.len(),
            (config.sample_size / 3).min(total - head)
        );

        let (head_starts, test_starts) = all_starts(&dataset);
        if let Some(first_test) = test_starts.first() {
            assert!(head_starts.iter().all(|s| s < first_test));
            assert_eq!(*first_test, head);
        }
        // Temporal order is kept inside and across train/validation
        assert!(head_starts.windows(2).all(|pair| pair[0] + 1 == pair[1]));
        assert!(test_starts.windows(2).all(|pair| pair[0] + 1 == pair[1]));
    }
}

#[test]
fn test_rebuild_is_identical() {
    let trajectory = random_trajectory(150, 99);
    let config = DatasetConfig::new(12, 1, 100);
    let first = prepare_dataset(&trajectory, &config).unwrap();
    let second = prepare_dataset(&trajectory, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_reference_example() {
    let trajectory = linear_trajectory(100);
    let dataset = prepare_dataset(&trajectory, &DatasetConfig::new(5, 1, 10)).unwrap();

    assert_eq!(dataset.total_windows, 94);
    assert_eq!(dataset.head_windows, 75);
    assert_eq!(dataset.train.len(), 8);
    assert_eq!(dataset.validation.len(), 2);
    assert_eq!(dataset.test.len(), 3);

    for (split, offset) in [(&dataset.train, 0usize), (&dataset.validation, 8)] {
        for sample in 0..split.len() {
            let start = sample + offset;
            for t in 0..5 {
                let i = (start + t) as f32;
                assert_eq!(split.inputs[[sample, t, 0]], i);
                assert_eq!(split.inputs[[sample, t, 1]], 2.0 * i);
            }
            let next = (start + 5) as f32;
            assert_eq!(split.targets[[sample, 0]], next);
            assert_eq!(split.targets[[sample, 1]], 2.0 * next);
        }
    }
}

#[test]
fn test_oversized_sample_size_uses_available_windows() {
    let trajectory = linear_trajectory(40);
    let config = DatasetConfig::new(5, 1, 10_000);
    let dataset = prepare_dataset(&trajectory, &config).unwrap();

    // 34 windows, 27 in the head region, 7 in the tail
    assert_eq!(dataset.train.len() + dataset.validation.len(), 27);
    assert_eq!(dataset.train.len(), 21);
    assert_eq!(dataset.test.len(), 7);
    assert_eq!(dataset.train.inputs.dim(), (21, 5, 2));
    assert_eq!(dataset.validation.targets.dim(), (6, 2));
}

#[test]
fn test_test_cap_is_a_third_of_sample_size() {
    let partition = partition_windows(10_000, 100);
    assert_eq!(partition.test.len(), 33);
    assert_eq!(partition.test.start, 8000);
}

#[test]
fn test_single_window_trajectory() {
    let trajectory = linear_trajectory(7);
    let dataset = prepare_dataset(&trajectory, &DatasetConfig::new(5, 1, 10)).unwrap();

    // The only window falls in the tail region
    assert_eq!(dataset.total_windows, 1);
    assert!(dataset.train.is_empty());
    assert!(dataset.validation.is_empty());
    assert_eq!(dataset.test.len(), 1);
    assert_eq!(dataset.train.inputs.dim(), (0, 5, 2));
}

//! pulse-reactive benchmark suite
//!
//! Hot paths: reactive reads, write-notify-flush cycles, dependency
//! re-collection when a getter switches branches, and deep traversal.
//!
//! ```bash
//! cargo bench                 # everything
//! cargo bench -- "read/"      # read paths only
//! cargo bench -- "flush/"     # scheduler paths only
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pulse_reactive::{
    observe, run_deferred, set_async, Record, Scope, Sequence, Value, WatchSource, Watcher,
    WatcherOptions,
};

fn scope_with_keys(n: usize) -> Scope {
    let record = Record::new();
    for i in 0..n {
        record.set(&format!("k{i}"), Value::from(i));
    }
    Scope::new(Value::Record(record))
}

fn read_paths(c: &mut Criterion) {
    let mut g = c.benchmark_group("read");

    // untracked read (no watcher on the stack)
    let scope = scope_with_keys(8);
    g.bench_function("untracked_get", |b| {
        let data = scope.data();
        let record = data.as_record().unwrap().clone();
        b.iter(|| black_box(record.get("k3")))
    });

    // tracked read through a watcher evaluation
    g.bench_function("tracked_reevaluation", |b| {
        let scope = scope_with_keys(8);
        let watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| {
                let record = s.data();
                let record = record.as_record().unwrap().clone();
                let mut total = 0.0;
                for i in 0..8 {
                    total += record.get(&format!("k{i}")).as_num().unwrap_or(0.0);
                }
                Value::from(total)
            }),
            |_, _, _| {},
            WatcherOptions::default(),
            false,
        );
        b.iter(|| {
            watcher.evaluate();
            black_box(watcher.value())
        })
    });

    g.finish();
}

fn observe_paths(c: &mut Criterion) {
    let mut g = c.benchmark_group("observe");

    g.bench_function("record_16_keys", |b| {
        b.iter(|| {
            let record = Record::new();
            for i in 0..16 {
                record.set(&format!("k{i}"), Value::from(i));
            }
            let value = Value::Record(record);
            black_box(observe(&value, false))
        })
    });

    g.bench_function("sequence_64_items", |b| {
        b.iter(|| {
            let items: Vec<Value> = (0..64).map(Value::from).collect();
            let value = Value::Seq(Sequence::from_values(items));
            black_box(observe(&value, false))
        })
    });

    g.finish();
}

fn flush_paths(c: &mut Criterion) {
    let mut g = c.benchmark_group("flush");

    g.bench_function("write_then_flush", |b| {
        let scope = scope_with_keys(1);
        let _watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| {
                let data = s.data();
                data.as_record().unwrap().get("k0")
            }),
            |_, _, _| {},
            WatcherOptions::default(),
            false,
        );
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            scope
                .data()
                .as_record()
                .unwrap()
                .set("k0", Value::from(n));
            run_deferred();
        })
    });

    g.bench_function("inline_write", |b| {
        set_async(false);
        let scope = scope_with_keys(1);
        let _watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| {
                let data = s.data();
                data.as_record().unwrap().get("k0")
            }),
            |_, _, _| {},
            WatcherOptions::default(),
            false,
        );
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            scope
                .data()
                .as_record()
                .unwrap()
                .set("k0", Value::from(n));
        });
        set_async(true);
    });

    // branch switch forces full dep re-collection and stale pruning
    g.bench_function("dep_recollection", |b| {
        set_async(false);
        let scope = scope_with_keys(8);
        let _watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| {
                let data = s.data();
                let record = data.as_record().unwrap();
                if record.get("k0").as_num().unwrap_or(0.0) as i64 % 2 == 0 {
                    record.get("k1")
                } else {
                    record.get("k2")
                }
            }),
            |_, _, _| {},
            WatcherOptions::default(),
            false,
        );
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            scope
                .data()
                .as_record()
                .unwrap()
                .set("k0", Value::from(n));
        });
        set_async(true);
    });

    g.finish();
}

criterion_group!(benches, read_paths, observe_paths, flush_paths);
criterion_main!(benches);

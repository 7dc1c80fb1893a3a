use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use spatio_filter::accumulator::ClassicAccumulator;
use spatio_filter::border::BorderType;
use spatio_filter::filter2d::FilterEngine2D;
use spatio_filter::kernels;
use spatio_grid::Matrix;

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("Gaussian Blur");

    for (width, height) in [(256, 224), (512, 448)].iter() {
        for kernel_size in [3, 5, 9].iter() {
            group.throughput(criterion::Throughput::Elements(
                (*width * *height * *kernel_size) as u64,
            ));

            let parameter_string = format!("{}x{}x{}", width, height, kernel_size);

            let mut src = Matrix::from_size_val(*height, *width, 0.0f32);
            for (i, v) in src.as_slice_mut().iter_mut().enumerate() {
                *v = (i % 251) as f32;
            }

            let separable = kernels::gaussian_kernel_2d(
                (*kernel_size, *kernel_size),
                (1.5, 1.5),
            );
            let dense = separable.to_dense();

            group.bench_with_input(
                BenchmarkId::new("separable_f32", &parameter_string),
                &src,
                |b, src| {
                    let engine = FilterEngine2D::new_separable(
                        separable.clone(),
                        ClassicAccumulator::default(),
                    );
                    let mut dst = Matrix::default();
                    b.iter(|| black_box(engine.apply(src, &mut dst, BorderType::Mirror)))
                },
            );

            group.bench_with_input(
                BenchmarkId::new("dense_f32", &parameter_string),
                &src,
                |b, src| {
                    let engine =
                        FilterEngine2D::new_dense(dense.clone(), ClassicAccumulator::default());
                    let mut dst = Matrix::default();
                    b.iter(|| black_box(engine.apply(src, &mut dst, BorderType::Mirror)))
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_filters);
criterion_main!(benches);

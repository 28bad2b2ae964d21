use std::hint::black_box;

use bencher::{TestCase, TestFile};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use micro_nio::buffer::ElasticBuffer;
use micro_nio::framer::Framer;
use micro_nio_http::HttpFramer;

static SMALL_HEADER: TestFile = TestFile::new("get_small.txt", include_bytes!("../resources/request/get_small.txt"));
static LARGE_HEADER: TestFile = TestFile::new("get_large.txt", include_bytes!("../resources/request/get_large.txt"));
static WITH_BODY: TestFile = TestFile::new("post_body.txt", include_bytes!("../resources/request/post_body.txt"));

const BUFFER_INITIAL_CAPACITY: usize = 4 * 1024;

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::single("small_header", SMALL_HEADER),
        TestCase::single("large_header", LARGE_HEADER),
        TestCase::single("with_body", WITH_BODY),
        TestCase::pipelined("pipelined_small_x32", SMALL_HEADER, 32),
        TestCase::pipelined("pipelined_body_x32", WITH_BODY, 32),
        TestCase::fragmented("byte_at_a_time_large_header", LARGE_HEADER),
    ]
}

fn benchmark_http_framer(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("http_framer");

    for case in create_test_cases() {
        group.throughput(Throughput::Bytes(case.total_bytes() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let mut framer = HttpFramer::new();
            b.iter_batched_ref(
                || (case.reads(), ElasticBuffer::new(BUFFER_INITIAL_CAPACITY)),
                |(reads, buffer)| {
                    let mut framed = 0;
                    for read in reads.iter() {
                        buffer.append(read);
                        let requests = framer.parse(buffer).expect("input should be valid http requests");
                        framed += requests.len();
                        black_box(requests);
                    }
                    assert_eq!(framed, case.expected_requests(), "framing {}", case.file().file_name());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(framer, benchmark_http_framer);
criterion_main!(framer);

/// Benchmarks for role resolution
///
/// Measures performance of:
/// - Registry building with wildcard expansion
/// - Single-role and merged resolution
/// - Nested association authorization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rolegate_authz::associations::{AssociationRequest, PolicyCatalog};
use rolegate_authz::engine::{Evaluator, QueryOutcome};
use rolegate_authz::roles::{FieldSpec, RoleDeclaration, RoleRegistry, Wildcard};
use rolegate_authz::schema::StaticSchema;
use serde_json::json;
use std::sync::Arc;

fn schema() -> StaticSchema {
    let fields: Vec<String> = (0..40).map(|i| format!("field_{}", i)).collect();
    StaticSchema::new()
        .resource("user", fields.clone())
        .association("user", "posts", "post")
        .resource("post", fields.clone())
        .association("post", "comments", "comment")
        .resource("comment", fields)
}

fn user_registry(roles: usize) -> RegistryFixture {
    let schema = schema();
    let mut builder = RoleRegistry::builder("user");
    for i in 0..roles {
        builder = builder.role(
            RoleDeclaration::new(format!("role_{}", i))
                .attributes(Wildcard::SaveAll)
                .associations(FieldSpec::explicit().show(["posts"]))
                .associated_as("posts", ["reader"]),
        );
    }
    RegistryFixture {
        registry: builder.build(&schema).unwrap(),
        names: (0..roles).map(|i| format!("role_{}", i)).collect(),
    }
}

struct RegistryFixture {
    registry: RoleRegistry,
    names: Vec<String>,
}

fn bench_registry_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_build");

    for roles in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(roles), &roles, |b, &roles| {
            b.iter(|| user_registry(black_box(roles)));
        });
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for roles in [1, 5, 20] {
        let fixture = user_registry(roles);
        let outcome = QueryOutcome::Roles(fixture.names.clone());

        group.bench_with_input(BenchmarkId::from_parameter(roles), &outcome, |b, outcome| {
            let evaluator = Evaluator::new(&fixture.registry);
            b.iter(|| evaluator.resolve(black_box(outcome), false, |_| Ok(true)).unwrap());
        });
    }

    group.finish();
}

fn bench_associations(c: &mut Criterion) {
    let mut group = c.benchmark_group("associations");

    let mut catalog = PolicyCatalog::new(Arc::new(schema()));
    let users = catalog
        .register(user_registry(5).registry)
        .unwrap();
    catalog
        .declare(
            RoleRegistry::builder("post").role(
                RoleDeclaration::new("reader")
                    .attributes(Wildcard::ShowAll)
                    .associations(FieldSpec::explicit().show(["comments"]))
                    .associated_as("comments", ["reader"]),
            ),
        )
        .unwrap();
    catalog
        .declare(RoleRegistry::builder("comment").role(RoleDeclaration::new("reader").attributes(Wildcard::ShowAll)))
        .unwrap();

    let parent = Evaluator::new(&users)
        .merge(users.role_names().filter(|name| *name != "guest"))
        .unwrap();

    let flat = vec![AssociationRequest::name("posts")];
    group.bench_function("flat", |b| {
        b.iter(|| catalog.authorize_associations("user", &parent, black_box(&flat)).unwrap());
    });

    let nested = AssociationRequest::parse_list(&json!([{"posts": ["comments"]}])).unwrap();
    group.bench_function("nested", |b| {
        b.iter(|| catalog.authorize_associations("user", &parent, black_box(&nested)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_registry_build, bench_resolution, bench_associations);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stackvm::Vm;

fn sum_program() -> Vm {
    let mut vm = Vm::new();
    vm.push();
    vm.push();
    vm.push();
    vm.set_int(0, 17);
    vm.set_int(1, 25);
    vm.add(0, 1, 2);
    vm
}

fn loop_program() -> Vm {
    let mut vm = Vm::new();
    vm.push();
    vm.push();
    vm.push();
    vm.push();
    vm.set_int(0, 0);
    vm.set_int(1, 10_000);
    vm.set_int(2, 1);
    vm.less(0, 1, 3);
    vm.jcond(6, 3);
    vm.jump(8);
    vm.add(0, 2, 0);
    vm.jump(3);
    vm
}

fn run_bench(c: &mut Criterion) {
    c.bench_function("run_small_program", |b| {
        b.iter(|| {
            let mut vm = black_box(sum_program());
            vm.run().unwrap();
        });
    });

    c.bench_function("run_ten_thousand_iteration_loop", |b| {
        b.iter(|| {
            let mut vm = black_box(loop_program());
            vm.run().unwrap();
        });
    });
}

fn dump_bench(c: &mut Criterion) {
    let mut vm = sum_program();
    vm.run().unwrap();
    c.bench_function("stack_dump", |b| {
        b.iter(|| {
            vm.execute(stackvm::instruction::Instruction::new(
                stackvm::instruction::Opcode::Stack,
                0,
                stackvm::instruction::Operand::None,
                0,
            ))
            .unwrap();
        });
    });
}

criterion_group!(benches, run_bench, dump_bench);
criterion_main!(benches);

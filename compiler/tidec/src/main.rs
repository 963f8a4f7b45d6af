use tidec_abi::target::{BackendKind, LirTarget, TargetFeatures};
use tidec_lir::expr::{DeviceApi, ElemTy, Expr, ExprTy, HvxMode, Stmt};
use tracing::{debug, info};

// TIDEC_FILTER=debug cargo run
//
// Builds a small demo kernel:
// ```text
// for i in hvx_64:
//     out[ramp(i, 1, 16)] = in[ramp(i*16 + 6, 1, 16)]
// ```
// `in`'s index is misaligned by 6 bytes relative to the loop's 64-byte HVX
// requirement, so `tidec_align::rewrite_loads` should widen-and-shuffle it.
fn main() {
    init_tidec_logger();
    debug!("logging initialized");

    let target = hvx_target();
    let kernel = demo_kernel();

    match tidec_align::rewrite_loads(kernel, &target) {
        Ok(rewritten) => info!("rewrite succeeded:\n{:#?}", rewritten),
        Err(err) => {
            eprintln!("load-alignment rewrite failed: {}", err);
            std::process::exit(1);
        }
    }
}

fn hvx_target() -> LirTarget {
    let mut target = LirTarget::new(BackendKind::Llvm);
    target.features = TargetFeatures {
        hvx_64: true,
        hvx_128: false,
    };
    target
}

fn demo_kernel() -> Stmt {
    let elem_ty = ExprTy::vector(ElemTy::Int8, 16);
    let loop_index = Expr::Var("i".to_string());

    let store_index = Expr::ramp(ElemTy::Int8, loop_index.clone(), Expr::IntImm(1), 16);
    let load_base = Expr::Add(
        Box::new(Expr::Mul(Box::new(loop_index), Box::new(Expr::IntImm(16)))),
        Box::new(Expr::IntImm(6)),
    );
    let load_index = Expr::ramp(ElemTy::Int8, load_base, Expr::IntImm(1), 16);
    let value = Expr::load(elem_ty, "in", load_index);

    Stmt::For {
        var: "i".to_string(),
        min: Expr::IntImm(0),
        extent: Expr::IntImm(64),
        device_api: DeviceApi::Hvx(Some(HvxMode::Hvx64)),
        body: Box::new(Stmt::Store {
            buffer: "out".to_string(),
            index: store_index,
            value,
        }),
    }
}

fn init_tidec_logger() {
    let cfg = tidec_log::LoggerConfig::from_env("TIDEC").expect("env var lookups are infallible here");
    if let Err(err) = tidec_log::Logger::init_logger(cfg) {
        eprintln!("error initializing logger: {:?}", err);
        std::process::exit(1);
    }
}

//! End-to-end golden tests: small programs compared against their exact IR
//! listing. The expected text pins down register numbering, label layout,
//! and the backpatched branch targets, so a regression anywhere in the
//! lowering engine shows up as a readable diff.

mod common;

use common::compile;
use indoc::indoc;

#[test]
fn constant_folded_globals() {
    let ir = compile(indoc! {"
        const int n = 2 + 3 * 4;
        int g = n + 1;
        int zeros[5] = {0, 0, 0, 0, 0};
        int mixed[5] = {1, 0, 0, 0, 0};

        int main() {
            return n;
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            @n = dso_local constant i32 14
            @g = dso_local global i32 15
            @zeros = dso_local global [5 x i32] zeroinitializer
            @mixed = dso_local global [5 x i32] [i32 1, i32 0, i32 0, i32 0, i32 0]
            define dso_local i32 @main() {
                ret i32 14
            }
        "}
    );
}

#[test]
fn short_circuit_and_with_else() {
    let ir = compile(indoc! {"
        int main() {
            int a = 0;
            int b = 3;
            int x;
            if (a != 0 && b != 0) x = 1;
            else x = 2;
            return x;
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca i32
                store i32 0, i32* %1
                %2 = alloca i32
                store i32 3, i32* %2
                %3 = alloca i32
                %4 = load i32, i32* %1
                %5 = icmp ne i32 %4, 0
                br i1 %5, label %6, label %10

            6:
                %7 = load i32, i32* %2
                %8 = icmp ne i32 %7, 0
                br i1 %8, label %9, label %10

            9:
                store i32 1, i32* %3
                br label %11

            10:
                store i32 2, i32* %3
                br label %11

            11:
                %12 = load i32, i32* %3
                ret i32 %12
            }
        "}
    );
}

#[test]
fn short_circuit_or_groups() {
    let ir = compile(indoc! {"
        int main() {
            int a = 0;
            int b = 1;
            int x = 0;
            if (a != 0 || b != 0) x = 5;
            return x;
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca i32
                store i32 0, i32* %1
                %2 = alloca i32
                store i32 1, i32* %2
                %3 = alloca i32
                store i32 0, i32* %3
                %4 = load i32, i32* %1
                %5 = icmp ne i32 %4, 0
                br i1 %5, label %9, label %6

            6:
                %7 = load i32, i32* %2
                %8 = icmp ne i32 %7, 0
                br i1 %8, label %9, label %10

            9:
                store i32 5, i32* %3
                br label %10

            10:
                %11 = load i32, i32* %3
                ret i32 %11
            }
        "}
    );
}

#[test]
fn continue_targets_the_step_block() {
    let ir = compile(indoc! {"
        int main() {
            int i;
            int s = 0;
            for (i = 0; i < 3; i = i + 1) {
                continue;
            }
            return s;
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca i32
                %2 = alloca i32
                store i32 0, i32* %2
                store i32 0, i32* %1
                br label %3

            3:
                %4 = load i32, i32* %1
                %5 = icmp slt i32 %4, 3
                br i1 %5, label %6, label %10

            6:
                br label %7

            7:
                %8 = load i32, i32* %1
                %9 = add i32 %8, 1
                store i32 %9, i32* %1
                br label %3

            10:
                %11 = load i32, i32* %2
                ret i32 %11
            }
        "}
    );
}

#[test]
fn break_jumps_to_the_loop_exit() {
    let ir = compile(indoc! {"
        int main() {
            int i;
            for (i = 0; ; i = i + 1) {
                if (i >= 3) break;
            }
            return i;
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca i32
                store i32 0, i32* %1
                br label %2

            2:
                %3 = load i32, i32* %1
                %4 = icmp sge i32 %3, 3
                br i1 %4, label %5, label %6

            5:
                br label %10

            6:
                br label %7

            7:
                %8 = load i32, i32* %1
                %9 = add i32 %8, 1
                store i32 %9, i32* %1
                br label %2

            10:
                %11 = load i32, i32* %1
                ret i32 %11
            }
        "}
    );
}

#[test]
fn array_parameter_decays_to_a_pointer() {
    let ir = compile(indoc! {"
        int sum(int a[], int n) {
            int s = 0;
            int i;
            for (i = 0; i < n; i = i + 1) {
                s = s + a[i];
            }
            return s;
        }

        int main() {
            int arr[3] = {1, 2, 3};
            return sum(arr, 3);
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @sum(i32* %0, i32 %1) {
                %3 = alloca i32*
                store i32* %0, i32** %3
                %4 = alloca i32
                store i32 %1, i32* %4
                %5 = alloca i32
                store i32 0, i32* %5
                %6 = alloca i32
                store i32 0, i32* %6
                br label %7

            7:
                %8 = load i32, i32* %6
                %9 = load i32, i32* %4
                %10 = icmp slt i32 %8, %9
                br i1 %10, label %11, label %21

            11:
                %12 = load i32, i32* %5
                %13 = load i32, i32* %6
                %14 = load i32*, i32** %3
                %15 = getelementptr i32, i32* %14, i32 %13
                %16 = load i32, i32* %15
                %17 = add i32 %12, %16
                store i32 %17, i32* %5
                br label %18

            18:
                %19 = load i32, i32* %6
                %20 = add i32 %19, 1
                store i32 %20, i32* %6
                br label %7

            21:
                %22 = load i32, i32* %5
                ret i32 %22
            }
            define dso_local i32 @main() {
                %1 = alloca [3 x i32]
                %2 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 0
                store i32 1, i32* %2
                %3 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 1
                store i32 2, i32* %3
                %4 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 2
                store i32 3, i32* %4
                %5 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 0
                %6 = call i32 @sum(i32* %5, i32 3)
                ret i32 %6
            }
        "}
    );
}

#[test]
fn void_function_printf_and_getint() {
    let ir = compile(indoc! {r#"
        void show(int x) {
            if (x > 0) {
                printf("%d\n", x);
            }
        }

        int main() {
            int v;
            v = getint();
            show(v);
            return 0;
        }
    "#});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local void @show(i32 %0) {
                %2 = alloca i32
                store i32 %0, i32* %2
                %3 = load i32, i32* %2
                %4 = icmp sgt i32 %3, 0
                br i1 %4, label %5, label %7

            5:
                %6 = load i32, i32* %2
                call void @putint(i32 %6)
                call void @putch(i32 10)
                br label %7

            7:
                ret void
            }
            define dso_local i32 @main() {
                %1 = alloca i32
                %2 = call i32 @getint()
                store i32 %2, i32* %1
                %3 = load i32, i32* %1
                call void @show(i32 %3)
                ret i32 0
            }
        "}
    );
}

#[test]
fn two_dimensional_local_array_access() {
    let ir = compile(indoc! {"
        int main() {
            int m[2][3] = {{1, 2, 3}, {4, 5, 6}};
            int j = 1;
            return m[1][j];
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca [2 x [3 x i32]]
                %2 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 0, i32 0
                store i32 1, i32* %2
                %3 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 0, i32 1
                store i32 2, i32* %3
                %4 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 0, i32 2
                store i32 3, i32* %4
                %5 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 1, i32 0
                store i32 4, i32* %5
                %6 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 1, i32 1
                store i32 5, i32* %6
                %7 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 1, i32 2
                store i32 6, i32* %7
                %8 = alloca i32
                store i32 1, i32* %8
                %9 = load i32, i32* %8
                %10 = getelementptr [2 x [3 x i32]], [2 x [3 x i32]]* %1, i32 0, i32 1, i32 %9
                %11 = load i32, i32* %10
                ret i32 %11
            }
        "}
    );
}

#[test]
fn local_array_partial_init_stores_only_written_elements() {
    let ir = compile(indoc! {"
        int main() {
            int a[4] = {7};
            return a[0];
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca [4 x i32]
                %2 = getelementptr [4 x i32], [4 x i32]* %1, i32 0, i32 0
                store i32 7, i32* %2
                %3 = getelementptr [4 x i32], [4 x i32]* %1, i32 0, i32 0
                %4 = load i32, i32* %3
                ret i32 %4
            }
        "}
    );
}

#[test]
fn const_local_array_zero_fills_and_folds() {
    let ir = compile(indoc! {"
        int main() {
            const int c[3] = {5};
            return c[1] + c[0];
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @main() {
                %1 = alloca [3 x i32]
                %2 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 0
                store i32 5, i32* %2
                %3 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 1
                store i32 0, i32* %3
                %4 = getelementptr [3 x i32], [3 x i32]* %1, i32 0, i32 2
                store i32 0, i32* %4
                ret i32 5
            }
        "}
    );
}

#[test]
fn const_global_array_access_folds_when_static() {
    let ir = compile(indoc! {"
        const int tbl[4] = {1, 2, 3, 4};

        int main() {
            return tbl[2];
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            @tbl = dso_local constant [4 x i32] [i32 1, i32 2, i32 3, i32 4]
            define dso_local i32 @main() {
                ret i32 3
            }
        "}
    );
}

#[test]
fn global_matrix_collapses_zero_rows() {
    let ir = compile(indoc! {"
        int grid[2][2] = {{0, 0}, {0, 9}};

        int main() {
            return grid[1][1];
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            @grid = dso_local global [2 x [2 x i32]] [[2 x i32] zeroinitializer, [2 x i32] [i32 0, i32 9]]
            define dso_local i32 @main() {
                %1 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* @grid, i32 0, i32 1, i32 1
                %2 = load i32, i32* %1
                ret i32 %2
            }
        "}
    );
}

#[test]
fn row_of_a_matrix_passes_as_a_pointer_argument() {
    let ir = compile(indoc! {"
        int first(int row[]) {
            return row[0];
        }

        int main() {
            int m[2][2] = {{1, 2}, {3, 4}};
            return first(m[1]);
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @first(i32* %0) {
                %2 = alloca i32*
                store i32* %0, i32** %2
                %3 = load i32*, i32** %2
                %4 = getelementptr i32, i32* %3, i32 0
                %5 = load i32, i32* %4
                ret i32 %5
            }
            define dso_local i32 @main() {
                %1 = alloca [2 x [2 x i32]]
                %2 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 0, i32 0
                store i32 1, i32* %2
                %3 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 0, i32 1
                store i32 2, i32* %3
                %4 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 1, i32 0
                store i32 3, i32* %4
                %5 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 1, i32 1
                store i32 4, i32* %5
                %6 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 1, i32 0
                %7 = call i32 @first(i32* %6)
                ret i32 %7
            }
        "}
    );
}

#[test]
fn matrix_parameter_keeps_its_row_type() {
    let ir = compile(indoc! {"
        int get(int m[][2], int i, int j) {
            return m[i][j];
        }

        int main() {
            int g[2][2] = {{1, 2}, {3, 4}};
            return get(g, 1, 0);
        }
    "});

    assert_eq!(
        ir,
        indoc! {"
            declare i32 @getint()
            declare void @putint(i32)
            declare void @putch(i32)
            define dso_local i32 @get([2 x i32]* %0, i32 %1, i32 %2) {
                %4 = alloca [2 x i32]*
                store [2 x i32]* %0, [2 x i32]** %4
                %5 = alloca i32
                store i32 %1, i32* %5
                %6 = alloca i32
                store i32 %2, i32* %6
                %7 = load i32, i32* %5
                %8 = load i32, i32* %6
                %9 = load [2 x i32]*, [2 x i32]** %4
                %10 = getelementptr [2 x i32], [2 x i32]* %9, i32 %7, i32 %8
                %11 = load i32, i32* %10
                ret i32 %11
            }
            define dso_local i32 @main() {
                %1 = alloca [2 x [2 x i32]]
                %2 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 0, i32 0
                store i32 1, i32* %2
                %3 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 0, i32 1
                store i32 2, i32* %3
                %4 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 1, i32 0
                store i32 3, i32* %4
                %5 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 1, i32 1
                store i32 4, i32* %5
                %6 = getelementptr [2 x [2 x i32]], [2 x [2 x i32]]* %1, i32 0, i32 0
                %7 = call i32 @get([2 x i32]* %6, i32 1, i32 0)
                ret i32 %7
            }
        "}
    );
}

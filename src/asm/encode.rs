//! Packing statements into machine words.
//!
//! The encoder walks the root's statements with its own [`ProgramCounter`],
//! which lands on the same addresses the symbol table was built with.
//!
//! Operands that don't fit their field are reported and encoding moves on to the next
//! statement, so that every out-of-range operand is found in one run.

use slog::{debug, o, trace, Discard, Logger};

use crate::ast::format::Format;
use crate::ast::keyword::{Directive, Instruction};
use crate::ast::node::{InstructionData, NodeKind, SyntaxTreeNode};
use crate::ast::{IOffset, TrapVect8};
use crate::err::{Diagnostics, StageFailed};

use super::analyze::no_matching_format;
use super::pc::ProgramCounter;
use super::symbol::SymbolTable;
use super::{AsmErr, AsmErrKind, ObjectImage};

/// Encodes a syntax tree into an object image.
///
/// Instructions use the format recorded by [`analyze`](super::analyze::analyze)
/// when there is one. Every problem is reported into `diag`,
/// and no image is produced if there were any.
///
/// # Example
/// ```
/// use lc3_asm::asm::encode::encode;
/// use lc3_asm::asm::symbol::SymbolTable;
/// use lc3_asm::err::Diagnostics;
/// use lc3_asm::parse::parse_ast;
///
/// let src = ".orig x3000\nLOOP BRnp LOOP\n.end";
/// let mut diag = Diagnostics::new();
/// let root = parse_ast(src, &mut diag, None).unwrap();
/// let symbols = SymbolTable::build(&root, &mut diag, None).unwrap();
/// let image = encode(&root, &symbols, &mut diag, None).unwrap();
///
/// assert_eq!(image.words(), [0x3000, 0x0BFF]);
/// ```
pub fn encode(
    root: &SyntaxTreeNode<'_>,
    symbols: &SymbolTable,
    diag: &mut Diagnostics,
    logger: impl Into<Option<Logger>>
) -> Result<ObjectImage, StageFailed> {
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "encode"));

    let errors_before = diag.error_count();
    let mut words = vec![];
    let mut pc = ProgramCounter::new();

    for node in &root.children {
        pc.update(node);

        let result = match &node.kind {
            NodeKind::Instruction(data) => encode_instruction(node, data, pc, symbols)
                .map(|word| {
                    trace!(logger, "encoded instruction";
                        "address" => format_args!("x{:04X}", pc.address),
                        "word" => format_args!("x{word:04X}")
                    );
                    words.push(word);
                }),
            &NodeKind::Directive(d) => encode_directive(node, d, symbols, &mut words),
            _ => Ok(()),
        };

        if let Err(e) = result {
            diag.error(&e);
        }
    }

    StageFailed::check(diag, errors_before)?;
    debug!(logger, "encoded image"; "words" => words.len());
    Ok(ObjectImage::new(words))
}

fn encode_instruction<'s>(
    node: &SyntaxTreeNode<'s>,
    data: &InstructionData,
    pc: ProgramCounter,
    symbols: &SymbolTable
) -> Result<u16, AsmErr<'s>> {
    let args = &*node.children;
    let format = data.format
        .filter(|f| f.matches(args))
        .or_else(|| data.opcode.formats().iter().copied().find(|f| f.matches(args)));
    let Some(format) = format else {
        let kind = no_matching_format(node.text(), data.opcode.formats());
        return Err(AsmErr::new(kind, node.location()));
    };

    let word = data.opcode.opcode_word();
    let operands = match format {
        Format::Empty => 0,
        Format::Reg => register(&args[0]) << 6,
        Format::Addr => pc_offset::<11>(&args[0], pc, symbols)?,
        Format::Branch => {
            let NodeKind::BranchFlags(flags) = args[0].kind else {
                unreachable!("branch format starts with its flags")
            };
            flags.bits() << 9 | pc_offset::<9>(&args[1], pc, symbols)?
        },
        Format::Vec => trap_vect(&args[0])?,
        Format::RegReg => register(&args[0]) << 9 | register(&args[1]) << 6,
        Format::RegAddr => register(&args[0]) << 9 | pc_offset::<9>(&args[1], pc, symbols)?,
        Format::RegRegReg => register(&args[0]) << 9 | register(&args[1]) << 6 | register(&args[2]),
        Format::RegRegNum => {
            let regs = register(&args[0]) << 9 | register(&args[1]) << 6;
            match data.opcode {
                // immediate mode flag
                Instruction::Add | Instruction::And => regs | 0x20 | immediate::<5>(&args[2])?,
                _ => regs | immediate::<6>(&args[2])?,
            }
        },
        Format::Num | Format::Str | Format::NumAddr => unreachable!("{format:?} is only used by directives"),
    };

    Ok(word | operands)
}

fn encode_directive<'s>(
    node: &SyntaxTreeNode<'s>,
    directive: Directive,
    symbols: &SymbolTable,
    words: &mut Vec<u16>
) -> Result<(), AsmErr<'s>> {
    let args = &*node.children;
    if !directive.formats().iter().any(|f| f.matches(args)) {
        let kind = no_matching_format(&directive.to_string(), directive.formats());
        return Err(AsmErr::new(kind, node.location()));
    }

    match directive {
        Directive::Orig => words.push(number(&args[0])),
        Directive::Fill => words.push(address(&args[0], symbols)?),
        Directive::Blkw => {
            let count = number(&args[0]);
            let fill = match args.get(1) {
                Some(arg) => address(arg, symbols)?,
                None => 0,
            };
            words.extend(std::iter::repeat(fill).take(usize::from(count)));
        },
        Directive::Stringz => {
            let NodeKind::String(s) = &args[0].kind else {
                unreachable!("operand was checked to be a string")
            };
            words.extend(s.chars().map(|c| c as u16));
            words.push(0);
        },
        Directive::End => {},
    }

    Ok(())
}

fn register(arg: &SyntaxTreeNode<'_>) -> u16 {
    match arg.kind {
        NodeKind::Register(r) => u16::from(r),
        _ => unreachable!("operand was checked to be a register"),
    }
}

fn number(arg: &SyntaxTreeNode<'_>) -> u16 {
    match arg.kind {
        NodeKind::Number(n) => n,
        _ => unreachable!("operand was checked to be a number"),
    }
}

/// The value of an address-class operand: a literal, or the address of a label.
fn address<'s>(arg: &SyntaxTreeNode<'s>, symbols: &SymbolTable) -> Result<u16, AsmErr<'s>> {
    match arg.kind {
        NodeKind::Number(n) => Ok(n),
        NodeKind::LabelRef => symbols.lookup(arg.text()).ok_or_else(|| {
            AsmErr::new(AsmErrKind::UndefinedLabel(arg.text().to_string()), arg.location())
        }),
        _ => unreachable!("operand was checked to be an address"),
    }
}

/// The distance from the next instruction to an address operand, as an `N`-bit field.
fn pc_offset<'s, const N: u32>(arg: &SyntaxTreeNode<'s>, pc: ProgramCounter, symbols: &SymbolTable) -> Result<u16, AsmErr<'s>> {
    let target = address(arg, symbols)?;
    let offset = target.wrapping_sub(pc.next_address) as i16;

    IOffset::<N>::new(offset)
        .map(|off| off.field_bits())
        .map_err(|e| AsmErr::new(AsmErrKind::OffsetOutOfRange(i32::from(offset), e), arg.location()))
}

fn immediate<'s, const N: u32>(arg: &SyntaxTreeNode<'s>) -> Result<u16, AsmErr<'s>> {
    let value = number(arg) as i16;

    IOffset::<N>::new(value)
        .map(|imm| imm.field_bits())
        .map_err(|e| AsmErr::new(AsmErrKind::ImmOutOfRange(i32::from(value), e), arg.location()))
}

fn trap_vect<'s>(arg: &SyntaxTreeNode<'s>) -> Result<u16, AsmErr<'s>> {
    let value = number(arg);

    TrapVect8::new(value)
        .map(|vect| vect.field_bits())
        .map_err(|e| AsmErr::new(AsmErrKind::ImmOutOfRange(i32::from(value), e), arg.location()))
}

#[cfg(test)]
mod tests {
    use super::encode;
    use crate::asm::analyze::analyze;
    use crate::asm::symbol::SymbolTable;
    use crate::asm::ObjectImage;
    use crate::err::{Diagnostics, StageFailed};
    use crate::parse::parse_ast;

    fn run(src: &str) -> (Result<ObjectImage, StageFailed>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let mut root = parse_ast(src, &mut diag, None).unwrap();
        analyze(&mut root, &mut diag, None).unwrap();
        let symbols = SymbolTable::build(&root, &mut diag, None).unwrap();
        (encode(&root, &symbols, &mut diag, None), diag)
    }

    fn words(src: &str) -> Vec<u16> {
        let (image, diag) = run(src);
        match image {
            Ok(image) => image.into_words(),
            Err(e) => panic!("{e}\n{diag}"),
        }
    }

    #[test]
    fn test_register_forms() {
        let words = words("
            .orig x3000
            ADD R1, R2, R3
            AND R4, R5, #-1
            NOT R6, R7
            JMP R2
            JSRR R3
            RET
            RTI
            LDR R0, R6, #-1
            STR R7, R6, #31
            TRAP x25
            .end
        ");
        assert_eq!(words, [
            0x3000,
            0x1283,
            0x597F,
            0x9DFF,
            0xC080,
            0x40C0,
            0xC1C0,
            0x8000,
            0x61BF,
            0x7F9F,
            0xF025,
        ]);
    }

    #[test]
    fn test_pc_relative() {
        let words = words("
            .orig x3000
            LOOP LEA R1, DATA
            BRz LOOP
            JSR LOOP
            ST R2, DATA
            LDI R3, x3005
            DATA .fill LOOP
            .end
        ");
        assert_eq!(words, [0x3000, 0xE204, 0x05FE, 0x4FFD, 0x3401, 0xA600, 0x3000]);
    }

    #[test]
    fn test_directives() {
        let words = words("
            .orig x4000
            .fill #-1
            .blkw 2
            .blkw 2, xAB
            .stringz \"a\\n\"
            A .blkw 1 A
            .end
        ");
        assert_eq!(words, [0x4000, 0xFFFF, 0, 0, 0xAB, 0xAB, 0x61, 0x0A, 0, 0x4008]);
    }

    #[test]
    fn test_stringz_one_word_per_char() {
        // a Latin-1 source byte arrives as a single char
        let src: String = b".orig x3000\n.stringz \"caf\xE9\"\n.end".iter().map(|&b| b as char).collect();
        assert_eq!(words(&src), [0x3000, 0x63, 0x61, 0x66, 0xE9, 0]);
    }

    #[test]
    fn test_offset_bounds() {
        assert_eq!(words(".orig x3000\nBR FAR\n.blkw 255\nFAR HALT\n.end")[1], 0x0EFF);
        assert_eq!(words(".orig x3000\nBACK .blkw 255\nBR BACK\n.end")[256], 0x0F00);

        let (image, diag) = run(".orig x3000\nBR FAR\n.blkw 256\nFAR HALT\n.end");
        assert_eq!(image, Err(StageFailed { errors: 1 }));
        let error = diag.iter().next().unwrap();
        assert_eq!(error.message, "offset 256 does not fit in a signed 9-bit field");
        assert_eq!(error.help.as_deref(), Some("the target is too far from this instruction; the range for a signed 9-bit integer is [-256, 255]"));
        assert_eq!(error.location.as_ref().map(|l| (l.line, l.column)), Some((2, 3)));
    }

    #[test]
    fn test_errors_accumulate() {
        let (image, diag) = run("
            .orig x3000
            ADD R0, R0, #-17
            LDR R0, R0, #32
            JSR x4000
            TRAP x25
            .end
        ");
        assert!(image.is_err());
        let messages: Vec<_> = diag.error_messages().collect();
        assert_eq!(messages, [
            "value -17 does not fit in a signed 5-bit field",
            "value 32 does not fit in a signed 6-bit field",
            "offset 4093 does not fit in a signed 11-bit field",
        ]);
    }

    #[test]
    fn test_without_analysis() {
        let mut diag = Diagnostics::new();
        let root = parse_ast(".orig x3000\nADD R0, R0, #1\nADD R0\n.end", &mut diag, None).unwrap();
        let symbols = SymbolTable::build(&root, &mut diag, None).unwrap();
        assert!(encode(&root, &symbols, &mut diag, None).is_err());
        assert_eq!(diag.error_messages().collect::<Vec<_>>(), ["invalid operands for ADD"]);
    }
}
